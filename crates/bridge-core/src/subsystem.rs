//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Contracts the orchestrator requires from each subsystem.

use std::fmt;
use std::sync::Arc;

use bridge_common::config::BridgeConfig;
use thiserror::Error;

use crate::device::{Device, SearchTarget};

/// Result alias used by factories and subsystem stop operations.
pub type SubsystemResult<T> = Result<T, SubsystemError>;

/// Identifies one of the orchestrated components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsystemKind {
    Configuration,
    ProtocolHandler,
    Registry,
    Router,
    ControlPoint,
    LinkManager,
}

impl SubsystemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemKind::Configuration => "configuration",
            SubsystemKind::ProtocolHandler => "protocol-handler",
            SubsystemKind::Registry => "registry",
            SubsystemKind::Router => "router",
            SubsystemKind::ControlPoint => "control-point",
            SubsystemKind::LinkManager => "link-manager",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a subsystem factory or a subsystem stop operation.
#[derive(Debug, Error)]
pub enum SubsystemError {
    #[error("{subsystem} construction failed: {reason}")]
    Construction {
        subsystem: SubsystemKind,
        reason: String,
    },
    #[error("{subsystem} shutdown failed: {reason}")]
    Shutdown {
        subsystem: SubsystemKind,
        reason: String,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SubsystemError {
    pub fn construction(subsystem: SubsystemKind, reason: impl Into<String>) -> Self {
        Self::Construction {
            subsystem,
            reason: reason.into(),
        }
    }

    pub fn shutdown(subsystem: SubsystemKind, reason: impl Into<String>) -> Self {
        Self::Shutdown {
            subsystem,
            reason: reason.into(),
        }
    }
}

/// Configuration handle supplied by the caller before the service starts.
pub trait ServiceConfiguration: Send + Sync + fmt::Debug {
    /// Human-readable name of the configuration, logged on start.
    fn name(&self) -> &str;

    /// Settings consumed by the subsystems.
    fn settings(&self) -> &BridgeConfig;

    /// Release resources held by the configuration. Invoked last during shutdown.
    fn shutdown(&self) -> SubsystemResult<()>;
}

/// Handles protocol exchanges on behalf of every other subsystem.
pub trait ProtocolHandler: Send + Sync + fmt::Debug {
    /// Path prefix the bridge serves its resources under.
    fn namespace(&self) -> &str;
}

/// Receives device notifications from a [`Registry`].
pub trait RegistryListener: Send + Sync + fmt::Debug {
    fn device_added(&self, _device: &Device) {}

    fn device_removed(&self, _device: &Device) {}

    /// Invoked once the registry has released its devices.
    fn after_shutdown(&self) {}
}

/// Holds the devices known to the bridge and the listeners observing them.
pub trait Registry: Send + Sync + fmt::Debug {
    /// Attach a listener. A listener that is already attached is kept once.
    fn add_listener(&self, listener: Arc<dyn RegistryListener>);

    /// Detach a listener; returns whether it was attached.
    fn remove_listener(&self, listener: &Arc<dyn RegistryListener>) -> bool;

    fn listeners(&self) -> Vec<Arc<dyn RegistryListener>>;

    /// Store a device and notify listeners when it was not known before.
    fn add_device(&self, device: Device) -> SubsystemResult<bool>;

    /// Forget a device and notify listeners when it was known.
    fn remove_device(&self, udn: &str) -> SubsystemResult<Option<Device>>;

    fn device(&self, udn: &str) -> Option<Device>;

    fn devices(&self) -> Vec<Device>;

    fn shutdown(&self) -> SubsystemResult<()>;
}

/// Owns the network resources of the bridge.
pub trait Router: Send + Sync + fmt::Debug {
    fn is_enabled(&self) -> bool;

    fn shutdown(&self) -> SubsystemResult<()>;
}

/// Entry point for searches issued by the bridge.
///
/// There is no stop operation: the control point holds no resources of its own.
pub trait ControlPoint: Send + Sync + fmt::Debug {
    fn search(&self, target: &SearchTarget) -> Vec<Device>;
}

/// Maintains links to remote bridges.
pub trait LinkManager: Send + Sync + fmt::Debug {
    /// Listener the orchestrator registers with the registry during start.
    fn device_discovery(&self) -> Arc<dyn RegistryListener>;

    fn shutdown(&self) -> SubsystemResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(SubsystemKind::ProtocolHandler.to_string(), "protocol-handler");
        assert_eq!(SubsystemKind::LinkManager.to_string(), "link-manager");
    }

    #[test]
    fn error_messages_name_the_subsystem() {
        let err = SubsystemError::construction(SubsystemKind::Router, "port in use");
        assert_eq!(err.to_string(), "router construction failed: port in use");
        let err = SubsystemError::shutdown(SubsystemKind::Registry, "listener panicked");
        assert_eq!(err.to_string(), "registry shutdown failed: listener panicked");
    }
}

//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use tracing::debug;

use crate::service::{ServiceContext, ServiceHandle};
use crate::subsystem::{ProtocolHandler, SubsystemError, SubsystemKind, SubsystemResult};

/// Protocol handler serving bridge resources below the configured namespace.
#[derive(Debug)]
pub struct BridgeProtocolHandler {
    namespace: String,
}

impl BridgeProtocolHandler {
    pub fn new(service: &ServiceHandle) -> SubsystemResult<Self> {
        let configuration = service.configuration().ok_or_else(|| {
            SubsystemError::construction(
                SubsystemKind::ProtocolHandler,
                "service configuration unavailable",
            )
        })?;
        let namespace = configuration.settings().namespace.clone();
        debug!(namespace = %namespace, "protocol handler created");
        Ok(Self { namespace })
    }
}

impl ProtocolHandler for BridgeProtocolHandler {
    fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_has_no_configuration() {
        let err = BridgeProtocolHandler::new(&ServiceHandle::detached()).unwrap_err();
        assert!(matches!(
            err,
            SubsystemError::Construction {
                subsystem: SubsystemKind::ProtocolHandler,
                ..
            }
        ));
    }
}

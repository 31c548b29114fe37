//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Lifecycle orchestrator for the UPnP bridge.
//!
//! [`BridgeService`] brings the protocol handler, registry, router, control
//! point, and link manager up in dependency order, exposes them to concurrent
//! callers, and tears them down again. Subsystem implementations are supplied
//! through a [`SubsystemFactory`]; the [`local`] module carries in-memory
//! defaults.

pub mod device;
pub mod error;
pub mod events;
pub mod factory;
pub mod local;
pub mod service;
pub mod subsystem;

pub use device::{Device, SearchTarget};
pub use error::ServiceError;
pub use events::{LifecycleEvent, LifecycleEvents};
pub use factory::SubsystemFactory;
pub use service::{BridgeService, ServiceContext, ServiceHandle, ServiceStatus, Subsystems};
pub use subsystem::{
    ControlPoint, LinkManager, ProtocolHandler, Registry, RegistryListener, Router,
    ServiceConfiguration, SubsystemError, SubsystemKind, SubsystemResult,
};

//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use thiserror::Error;

use crate::subsystem::SubsystemError;

/// Errors returned by [`crate::BridgeService`] lifecycle operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `start()` was called before a configuration was supplied.
    #[error("configuration required to start service")]
    ConfigurationMissing,
    /// `start()` was called while the subsystems are already running.
    #[error("service already running")]
    AlreadyRunning,
    /// A factory or a stop operation failed; the original error is kept as-is.
    #[error(transparent)]
    Subsystem(#[from] SubsystemError),
}

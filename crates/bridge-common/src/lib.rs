//! ---
//! bridge_section: "01-core-functionality"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Shared primitives and utilities for the bridge runtime."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Shared primitives for the UPnP bridge workspace.
//! This crate exposes configuration loading and the tracing subscriber
//! setup consumed by the orchestrator and its subsystems.

pub mod config;
pub mod logging;

pub use config::{
    BridgeConfig, LinkConfig, LinkEndpointConfig, LoadedBridgeConfig, LoggingConfig,
    NetworkConfig, RegistryConfig,
};
pub use logging::{init_tracing, log_file_prefix, LogFormat};

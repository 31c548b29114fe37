//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use bridge_common::config::BridgeConfig;
use bridge_common::logging::init_tracing;
use tracing::{debug, info};

use crate::subsystem::{ServiceConfiguration, SubsystemResult};

/// Configuration backed by a [`BridgeConfig`] document.
#[derive(Debug)]
pub struct LocalConfiguration {
    name: String,
    settings: BridgeConfig,
    shut_down: AtomicBool,
}

impl LocalConfiguration {
    pub fn new(settings: BridgeConfig) -> Self {
        Self {
            name: settings.name.clone(),
            settings,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Load the first existing candidate file, honouring `UPNP_BRIDGE_CONFIG`.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = BridgeConfig::load_with_source(candidates)?;
        info!(
            source = %loaded.source.display(),
            name = %loaded.config.name,
            "bridge configuration loaded"
        );
        Ok(Self::new(loaded.config))
    }

    /// Install tracing from the `[logging]` section of these settings.
    pub fn init_logging(&self) -> Result<()> {
        init_tracing(&self.settings)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl ServiceConfiguration for LocalConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &BridgeConfig {
        &self.settings
    }

    fn shutdown(&self) -> SubsystemResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!(name = %self.name, "configuration already shut down");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_follows_settings() {
        let mut settings = BridgeConfig::default();
        settings.name = "attic-bridge".into();
        let configuration = LocalConfiguration::new(settings);
        assert_eq!(configuration.name(), "attic-bridge");
        assert_eq!(configuration.settings().namespace, "/upnp");
    }

    #[test]
    fn init_logging_writes_under_configured_prefix() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut settings = BridgeConfig::default();
        settings.name = "hallway".into();
        settings.logging.directory = temp.path().to_path_buf();
        let configuration = LocalConfiguration::new(settings);

        configuration.init_logging().expect("init logging");
        let names: Vec<String> = std::fs::read_dir(temp.path())
            .expect("read log dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("hallway."));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let configuration = LocalConfiguration::new(BridgeConfig::default());
        assert!(!configuration.is_shut_down());
        configuration.shutdown().unwrap();
        configuration.shutdown().unwrap();
        assert!(configuration.is_shut_down());
    }
}

//! ---
//! bridge_section: "01-core-functionality"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Shared primitives and utilities for the bridge runtime."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_name() -> String {
    "upnp-bridge".to_owned()
}

fn default_namespace() -> String {
    "/upnp".to_owned()
}

fn default_stream_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}

fn default_multicast_group() -> Ipv4Addr {
    Ipv4Addr::new(239, 255, 255, 250)
}

fn default_multicast_port() -> u16 {
    1900
}

fn default_maintenance_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_device_max_age() -> Duration {
    Duration::from_secs(1800)
}

fn default_max_pending() -> usize {
    1024
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the bridge service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`BridgeConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedBridgeConfig {
    pub config: BridgeConfig,
    pub source: PathBuf,
}

impl BridgeConfig {
    pub const ENV_CONFIG_PATH: &'static str = "UPNP_BRIDGE_CONFIG";

    /// Load configuration from disk, respecting the `UPNP_BRIDGE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedBridgeConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedBridgeConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedBridgeConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<BridgeConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("bridge name cannot be empty"));
        }
        if !self.namespace.starts_with('/') {
            return Err(anyhow!(
                "namespace '{}' must start with '/'",
                self.namespace
            ));
        }
        if self.namespace.len() > 1 && self.namespace.ends_with('/') {
            return Err(anyhow!(
                "namespace '{}' must not end with '/'",
                self.namespace
            ));
        }
        self.network.validate()?;
        self.registry.validate()?;
        self.link.validate()?;
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            namespace: default_namespace(),
            network: NetworkConfig::default(),
            registry: RegistryConfig::default(),
            link: LinkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::str::FromStr for BridgeConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: BridgeConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Local network endpoints used by the router.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default = "default_stream_listen")]
    pub stream_listen: SocketAddr,
    #[serde(default = "default_multicast_group")]
    pub multicast_group: Ipv4Addr,
    #[serde(default = "default_multicast_port")]
    pub multicast_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            stream_listen: default_stream_listen(),
            multicast_group: default_multicast_group(),
            multicast_port: default_multicast_port(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.multicast_group.is_multicast() {
            return Err(anyhow!(
                "multicast_group {} is not a multicast address",
                self.multicast_group
            ));
        }
        if self.multicast_port == 0 {
            return Err(anyhow!("multicast_port must be non-zero"));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    #[serde(default = "default_maintenance_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub maintenance_interval: Duration,
    /// Devices not re-announced within this age are expired by maintenance.
    #[serde(default = "default_device_max_age")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub device_max_age: Duration,
    #[serde(default)]
    pub max_devices: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            maintenance_interval: default_maintenance_interval(),
            device_max_age: default_device_max_age(),
            max_devices: None,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.maintenance_interval.is_zero() {
            return Err(anyhow!("registry maintenance_interval must be positive"));
        }
        if self.device_max_age.is_zero() {
            return Err(anyhow!("registry device_max_age must be positive"));
        }
        if self.max_devices == Some(0) {
            return Err(anyhow!("registry max_devices must be at least 1 when set"));
        }
        Ok(())
    }
}

/// Remote bridge endpoints the link manager announces devices to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    #[serde(default)]
    pub endpoints: IndexMap<String, LinkEndpointConfig>,
    /// Upper bound on queued announcements; the oldest are dropped beyond it.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoints: IndexMap::new(),
            max_pending: default_max_pending(),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pending == 0 {
            return Err(anyhow!("link max_pending must be at least 1"));
        }
        for (endpoint_id, endpoint) in &self.endpoints {
            if endpoint.callback.trim().is_empty() {
                return Err(anyhow!(
                    "link endpoint '{}' must declare a callback",
                    endpoint_id
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkEndpointConfig {
    pub callback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device known to the bridge registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    /// Unique device name, e.g. `uuid:...`.
    pub udn: String,
    /// Device type URN.
    pub device_type: String,
    pub friendly_name: String,
    /// Description URL the device was announced with.
    pub location: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl Device {
    pub fn new(
        udn: impl Into<String>,
        device_type: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            udn: udn.into(),
            device_type: device_type.into(),
            friendly_name: friendly_name.into(),
            location: None,
            discovered_at: Utc::now(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Search criteria understood by the control point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    All,
    DeviceType(String),
    Udn(String),
}

impl SearchTarget {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            SearchTarget::All => true,
            SearchTarget::DeviceType(device_type) => &device.device_type == device_type,
            SearchTarget::Udn(udn) => &device.udn == udn,
        }
    }
}

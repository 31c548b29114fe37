//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use std::sync::Arc;

use tracing::debug;

use crate::device::{Device, SearchTarget};
use crate::subsystem::{ControlPoint, ProtocolHandler, Registry, ServiceConfiguration};

/// Control point answering searches from the registry's device cache.
#[derive(Debug)]
pub struct LocalControlPoint {
    namespace: String,
    registry: Arc<dyn Registry>,
}

impl LocalControlPoint {
    pub fn new(
        configuration: &dyn ServiceConfiguration,
        protocol: Arc<dyn ProtocolHandler>,
        registry: Arc<dyn Registry>,
    ) -> Self {
        debug!(configuration = %configuration.name(), "control point created");
        Self {
            namespace: protocol.namespace().to_owned(),
            registry,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl ControlPoint for LocalControlPoint {
    fn search(&self, target: &SearchTarget) -> Vec<Device> {
        let found: Vec<Device> = self
            .registry
            .devices()
            .into_iter()
            .filter(|device| target.matches(device))
            .collect();
        debug!(target = ?target, found = found.len(), "search answered from cache");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalConfiguration, LocalRegistry};
    use bridge_common::config::{BridgeConfig, RegistryConfig};

    #[derive(Debug)]
    struct Namespace;

    impl ProtocolHandler for Namespace {
        fn namespace(&self) -> &str {
            "/bridge"
        }
    }

    #[test]
    fn search_filters_cached_devices() {
        let registry: Arc<dyn Registry> =
            Arc::new(LocalRegistry::with_settings(&RegistryConfig::default()));
        registry
            .add_device(Device::new("uuid:a", "urn:schemas-upnp-org:device:MediaServer:1", "NAS"))
            .unwrap();
        registry
            .add_device(Device::new("uuid:b", "urn:schemas-upnp-org:device:MediaRenderer:1", "TV"))
            .unwrap();
        let configuration = LocalConfiguration::new(BridgeConfig::default());
        let control_point = LocalControlPoint::new(&configuration, Arc::new(Namespace), registry);

        assert_eq!(control_point.namespace(), "/bridge");
        assert_eq!(control_point.search(&SearchTarget::All).len(), 2);
        let renderers = control_point.search(&SearchTarget::DeviceType(
            "urn:schemas-upnp-org:device:MediaRenderer:1".into(),
        ));
        assert_eq!(renderers.len(), 1);
        assert_eq!(renderers[0].udn, "uuid:b");
        assert!(control_point
            .search(&SearchTarget::Udn("uuid:missing".into()))
            .is_empty());
    }
}

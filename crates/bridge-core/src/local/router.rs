//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::device::Device;
use crate::subsystem::{
    ProtocolHandler, Registry, Router, ServiceConfiguration, SubsystemError, SubsystemResult,
};

/// Router that hands announcements straight to the registry.
///
/// No sockets are opened; the listen address and multicast group are kept for
/// inspection only.
#[derive(Debug)]
pub struct LocalRouter {
    stream_listen: SocketAddr,
    multicast: SocketAddrV4,
    registry: Arc<dyn Registry>,
    enabled: AtomicBool,
}

impl LocalRouter {
    pub fn new(
        configuration: &dyn ServiceConfiguration,
        protocol: Arc<dyn ProtocolHandler>,
        registry: Arc<dyn Registry>,
    ) -> Self {
        let network = &configuration.settings().network;
        let multicast = SocketAddrV4::new(network.multicast_group, network.multicast_port);
        info!(
            listen = %network.stream_listen,
            multicast = %multicast,
            namespace = %protocol.namespace(),
            "router enabled"
        );
        Self {
            stream_listen: network.stream_listen,
            multicast,
            registry,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn stream_listen(&self) -> SocketAddr {
        self.stream_listen
    }

    pub fn multicast_group(&self) -> SocketAddrV4 {
        self.multicast
    }

    /// Feed an `ssdp:alive` announcement into the registry.
    pub fn deliver_announcement(&self, device: Device) -> SubsystemResult<bool> {
        if !self.is_enabled() {
            return Err(SubsystemError::Other(anyhow!(
                "router disabled; announcement for {} dropped",
                device.udn
            )));
        }
        self.registry.add_device(device)
    }

    /// Feed an `ssdp:byebye` notification into the registry.
    pub fn deliver_byebye(&self, udn: &str) -> SubsystemResult<Option<Device>> {
        if !self.is_enabled() {
            return Err(SubsystemError::Other(anyhow!(
                "router disabled; byebye for {} dropped",
                udn
            )));
        }
        self.registry.remove_device(udn)
    }
}

impl Router for LocalRouter {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn shutdown(&self) -> SubsystemResult<()> {
        if self.enabled.swap(false, Ordering::SeqCst) {
            info!(listen = %self.stream_listen, "router disabled");
        } else {
            debug!("router already disabled");
        }
        Ok(())
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
            "/upnp"
        }
    }

    #[test]
    fn announcements_reach_registry_until_shutdown() {
        let configuration = LocalConfiguration::new(BridgeConfig::default());
        let registry: Arc<dyn Registry> =
            Arc::new(LocalRegistry::with_settings(&RegistryConfig::default()));
        let router = LocalRouter::new(&configuration, Arc::new(Namespace), registry.clone());
        assert_eq!(router.multicast_group().port(), 1900);

        let device = Device::new("uuid:tv", "urn:schemas-upnp-org:device:MediaRenderer:1", "TV");
        assert!(router.deliver_announcement(device.clone()).unwrap());
        assert_eq!(registry.devices().len(), 1);
        assert!(router.deliver_byebye("uuid:tv").unwrap().is_some());

        router.shutdown().unwrap();
        assert!(!router.is_enabled());
        assert!(router.deliver_announcement(device).is_err());
        assert!(registry.devices().is_empty());
    }
}

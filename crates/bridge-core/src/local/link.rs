//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Links to remote bridges and the discovery listener feeding them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use bridge_common::config::LinkConfig;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::service::{ServiceContext, ServiceHandle};
use crate::subsystem::{
    LinkManager, RegistryListener, SubsystemError, SubsystemKind, SubsystemResult,
};

/// Remote bridge reachable through a callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEndpoint {
    pub id: String,
    pub callback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementKind {
    Added,
    Removed,
}

/// Device change queued for delivery to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub endpoint: String,
    pub callback: String,
    pub kind: AnnouncementKind,
    pub device: Device,
}

#[derive(Debug)]
struct LinkState {
    endpoints: IndexMap<String, LinkEndpoint>,
    discovered: IndexMap<String, Device>,
    pending: VecDeque<Announcement>,
    max_pending: usize,
    dropped: u64,
}

impl LinkState {
    fn queue(&mut self, kind: AnnouncementKind, device: &Device) {
        for endpoint in self.endpoints.values() {
            if self.pending.len() >= self.max_pending {
                if let Some(oldest) = self.pending.pop_front() {
                    self.dropped += 1;
                    warn!(
                        endpoint = %oldest.endpoint,
                        udn = %oldest.device.udn,
                        max_pending = self.max_pending,
                        "announcement queue full; dropping oldest"
                    );
                }
            }
            self.pending.push_back(Announcement {
                endpoint: endpoint.id.clone(),
                callback: endpoint.callback.clone(),
                kind,
                device: device.clone(),
            });
        }
    }
}

/// Registry listener recording discovered devices for the link manager.
///
/// Queued announcements are bounded; once full the oldest one is dropped.
#[derive(Debug)]
pub struct DeviceDiscovery {
    state: Mutex<LinkState>,
}

impl DeviceDiscovery {
    pub fn new(max_pending: usize) -> Self {
        Self {
            state: Mutex::new(LinkState {
                endpoints: IndexMap::new(),
                discovered: IndexMap::new(),
                pending: VecDeque::new(),
                max_pending: max_pending.max(1),
                dropped: 0,
            }),
        }
    }

    /// Devices currently known, in discovery order.
    pub fn discovered(&self) -> Vec<Device> {
        self.state.lock().discovered.values().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Announcements discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    /// Take every queued announcement, oldest first.
    pub fn drain_announcements(&self) -> Vec<Announcement> {
        self.state.lock().pending.drain(..).collect()
    }
}

impl Default for DeviceDiscovery {
    fn default() -> Self {
        Self::new(LinkConfig::default().max_pending)
    }
}

impl RegistryListener for DeviceDiscovery {
    fn device_added(&self, device: &Device) {
        let mut state = self.state.lock();
        state.discovered.insert(device.udn.clone(), device.clone());
        state.queue(AnnouncementKind::Added, device);
        debug!(udn = %device.udn, endpoints = state.endpoints.len(), "device discovered");
    }

    fn device_removed(&self, device: &Device) {
        let mut state = self.state.lock();
        state.discovered.shift_remove(&device.udn);
        state.queue(AnnouncementKind::Removed, device);
        debug!(udn = %device.udn, "device gone");
    }

    fn after_shutdown(&self) {
        self.state.lock().discovered.clear();
    }
}

/// Link manager keeping endpoints in memory.
#[derive(Debug)]
pub struct LocalLinkManager {
    service: ServiceHandle,
    discovery: Arc<DeviceDiscovery>,
    shut_down: AtomicBool,
}

impl LocalLinkManager {
    /// Create the manager with the endpoints and queue bound from `[link]`.
    pub fn new(service: ServiceHandle) -> Self {
        let configuration = service.configuration();
        let discovery = Arc::new(match &configuration {
            Some(configuration) => {
                DeviceDiscovery::new(configuration.settings().link.max_pending)
            }
            None => DeviceDiscovery::default(),
        });
        if let Some(configuration) = &configuration {
            let mut state = discovery.state.lock();
            for (id, endpoint) in &configuration.settings().link.endpoints {
                state.endpoints.insert(
                    id.clone(),
                    LinkEndpoint {
                        id: id.clone(),
                        callback: endpoint.callback.clone(),
                    },
                );
            }
            debug!(endpoints = state.endpoints.len(), "link endpoints seeded");
        }
        Self {
            service,
            discovery,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn register_endpoint(
        &self,
        id: impl Into<String>,
        callback: impl Into<String>,
    ) -> SubsystemResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SubsystemError::Other(anyhow!(
                "link manager is shut down; endpoint rejected"
            )));
        }
        let endpoint = LinkEndpoint {
            id: id.into(),
            callback: callback.into(),
        };
        if endpoint.callback.trim().is_empty() {
            return Err(SubsystemError::Other(anyhow!(
                "link endpoint '{}' requires a callback",
                endpoint.id
            )));
        }
        info!(id = %endpoint.id, callback = %endpoint.callback, "link endpoint registered");
        self.discovery
            .state
            .lock()
            .endpoints
            .insert(endpoint.id.clone(), endpoint);
        Ok(())
    }

    /// Remove an endpoint and its queued announcements.
    pub fn deregister_endpoint(&self, id: &str) -> bool {
        let mut state = self.discovery.state.lock();
        state.pending.retain(|announcement| announcement.endpoint != id);
        let removed = state.endpoints.shift_remove(id).is_some();
        if removed {
            info!(id = %id, "link endpoint deregistered");
        }
        removed
    }

    pub fn endpoints(&self) -> Vec<LinkEndpoint> {
        self.discovery.state.lock().endpoints.values().cloned().collect()
    }

    pub fn discovery(&self) -> &Arc<DeviceDiscovery> {
        &self.discovery
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl LinkManager for LocalLinkManager {
    fn device_discovery(&self) -> Arc<dyn RegistryListener> {
        self.discovery.clone()
    }

    fn shutdown(&self) -> SubsystemResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(registry) = self.service.registry() {
            let listener: Arc<dyn RegistryListener> = self.discovery.clone();
            if !registry.remove_listener(&listener) {
                debug!(
                    subsystem = %SubsystemKind::Registry,
                    "discovery listener was not attached"
                );
            }
        }
        let mut state = self.discovery.state.lock();
        state.endpoints.clear();
        state.pending.clear();
        info!("link manager shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> Device {
        Device::new("uuid:lamp", "urn:schemas-upnp-org:device:DimmableLight:1", "Lamp")
    }

    #[test]
    fn discovery_queues_one_announcement_per_endpoint() {
        let manager = LocalLinkManager::new(ServiceHandle::detached());
        manager.register_endpoint("attic", "http://10.0.0.2:8081/upnp/link").unwrap();
        manager.register_endpoint("garage", "http://10.0.0.3:8081/upnp/link").unwrap();

        let listener = manager.device_discovery();
        listener.device_added(&lamp());
        listener.device_removed(&lamp());

        let queued = manager.discovery().drain_announcements();
        assert_eq!(queued.len(), 4);
        assert_eq!(queued[0].endpoint, "attic");
        assert_eq!(queued[0].kind, AnnouncementKind::Added);
        assert_eq!(queued[3].kind, AnnouncementKind::Removed);
        assert!(manager.discovery().discovered().is_empty());
        assert!(manager.discovery().drain_announcements().is_empty());
    }

    #[test]
    fn pending_queue_is_bounded() {
        let discovery = DeviceDiscovery::new(3);
        {
            let mut state = discovery.state.lock();
            state.endpoints.insert(
                "attic".into(),
                LinkEndpoint {
                    id: "attic".into(),
                    callback: "http://10.0.0.2:8081/upnp/link".into(),
                },
            );
        }
        for _ in 0..1000 {
            discovery.device_added(&lamp());
            discovery.device_removed(&lamp());
        }

        assert_eq!(discovery.pending_len(), 3);
        assert_eq!(discovery.dropped(), 1997);
        let queued = discovery.drain_announcements();
        assert_eq!(queued[0].kind, AnnouncementKind::Removed);
        assert_eq!(queued[2].kind, AnnouncementKind::Removed);
        assert_eq!(discovery.pending_len(), 0);
    }

    #[test]
    fn deregistering_drops_pending_announcements() {
        let manager = LocalLinkManager::new(ServiceHandle::detached());
        manager.register_endpoint("attic", "http://10.0.0.2:8081/upnp/link").unwrap();
        manager.device_discovery().device_added(&lamp());

        assert!(manager.deregister_endpoint("attic"));
        assert!(!manager.deregister_endpoint("attic"));
        assert!(manager.discovery().drain_announcements().is_empty());
        assert_eq!(manager.discovery().discovered().len(), 1);
    }

    #[test]
    fn rejects_empty_callback_and_registration_after_shutdown() {
        let manager = LocalLinkManager::new(ServiceHandle::detached());
        assert!(manager.register_endpoint("attic", " ").is_err());

        manager.shutdown().unwrap();
        manager.shutdown().unwrap();
        assert!(manager.is_shut_down());
        assert!(manager
            .register_endpoint("attic", "http://10.0.0.2:8081/upnp/link")
            .is_err());
    }
}

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
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use bridge_common::config::RegistryConfig;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::device::Device;
use crate::service::{ServiceContext, ServiceHandle};
use crate::subsystem::{
    Registry, RegistryListener, SubsystemError, SubsystemKind, SubsystemResult,
};

#[derive(Debug, Default)]
struct RegistryInner {
    devices: IndexMap<String, Device>,
    listeners: Vec<Arc<dyn RegistryListener>>,
    shut_down: bool,
}

/// Registry keeping devices in discovery order.
///
/// Listeners are notified after the internal lock is released, so a listener
/// may call back into the registry.
#[derive(Debug)]
pub struct LocalRegistry {
    maintenance_interval: Duration,
    device_max_age: Duration,
    max_devices: Option<usize>,
    inner: Mutex<RegistryInner>,
}

impl LocalRegistry {
    pub fn new(service: &ServiceHandle) -> SubsystemResult<Self> {
        let configuration = service.configuration().ok_or_else(|| {
            SubsystemError::construction(SubsystemKind::Registry, "service configuration unavailable")
        })?;
        Ok(Self::with_settings(&configuration.settings().registry))
    }

    pub fn with_settings(settings: &RegistryConfig) -> Self {
        debug!(
            maintenance_interval_secs = settings.maintenance_interval.as_secs(),
            device_max_age_secs = settings.device_max_age.as_secs(),
            max_devices = ?settings.max_devices,
            "registry created"
        );
        Self {
            maintenance_interval: settings.maintenance_interval,
            device_max_age: settings.device_max_age,
            max_devices: settings.max_devices,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Remove devices not re-announced within `device_max_age` of `now` and
    /// notify listeners of each removal.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Vec<Device> {
        let (expired, listeners) = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return Vec::new();
            }
            let max_age = self.device_max_age;
            let stale: Vec<String> = inner
                .devices
                .values()
                .filter(|device| {
                    matches!(
                        now.signed_duration_since(device.discovered_at).to_std(),
                        Ok(age) if age > max_age
                    )
                })
                .map(|device| device.udn.clone())
                .collect();
            let expired: Vec<Device> = stale
                .iter()
                .filter_map(|udn| inner.devices.shift_remove(udn))
                .collect();
            (expired, inner.listeners.clone())
        };
        for device in &expired {
            debug!(udn = %device.udn, "device expired");
            for listener in &listeners {
                listener.device_removed(device);
            }
        }
        expired
    }

    /// Run `expire_stale` every `maintenance_interval` on a background thread.
    ///
    /// The thread holds only a weak reference and exits once the registry is
    /// shut down or dropped.
    pub fn spawn_maintenance(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let interval = self.maintenance_interval;
        thread::spawn(move || loop {
            thread::sleep(interval);
            let Some(registry) = registry.upgrade() else {
                break;
            };
            if registry.is_shut_down() {
                break;
            }
            let expired = registry.expire_stale(Utc::now());
            if !expired.is_empty() {
                info!(expired = expired.len(), "registry maintenance expired devices");
            }
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }
}

fn rejected(operation: &str) -> SubsystemError {
    SubsystemError::Other(anyhow!("registry is shut down; cannot {}", operation))
}

impl Registry for LocalRegistry {
    fn add_listener(&self, listener: Arc<dyn RegistryListener>) {
        let mut inner = self.inner.lock();
        if inner.shut_down {
            debug!("listener ignored; registry is shut down");
            return;
        }
        if !inner.listeners.iter().any(|known| Arc::ptr_eq(known, &listener)) {
            inner.listeners.push(listener);
        }
    }

    fn remove_listener(&self, listener: &Arc<dyn RegistryListener>) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|known| !Arc::ptr_eq(known, listener));
        inner.listeners.len() != before
    }

    fn listeners(&self) -> Vec<Arc<dyn RegistryListener>> {
        self.inner.lock().listeners.clone()
    }

    fn add_device(&self, device: Device) -> SubsystemResult<bool> {
        let listeners = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return Err(rejected("add device"));
            }
            if let Some(known) = inner.devices.get_mut(&device.udn) {
                *known = device;
                return Ok(false);
            }
            if let Some(max) = self.max_devices {
                if inner.devices.len() >= max {
                    return Err(SubsystemError::Other(anyhow!(
                        "registry full ({} devices); {} rejected",
                        max,
                        device.udn
                    )));
                }
            }
            inner.devices.insert(device.udn.clone(), device.clone());
            inner.listeners.clone()
        };
        debug!(udn = %device.udn, listeners = listeners.len(), "device added");
        for listener in &listeners {
            listener.device_added(&device);
        }
        Ok(true)
    }

    fn remove_device(&self, udn: &str) -> SubsystemResult<Option<Device>> {
        let (removed, listeners) = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return Err(rejected("remove device"));
            }
            match inner.devices.shift_remove(udn) {
                Some(device) => (device, inner.listeners.clone()),
                None => return Ok(None),
            }
        };
        debug!(udn = %udn, "device removed");
        for listener in &listeners {
            listener.device_removed(&removed);
        }
        Ok(Some(removed))
    }

    fn device(&self, udn: &str) -> Option<Device> {
        self.inner.lock().devices.get(udn).cloned()
    }

    fn devices(&self) -> Vec<Device> {
        self.inner.lock().devices.values().cloned().collect()
    }

    fn shutdown(&self) -> SubsystemResult<()> {
        let (released, listeners) = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return Ok(());
            }
            inner.shut_down = true;
            let released = inner.devices.len();
            inner.devices.clear();
            (released, std::mem::take(&mut inner.listeners))
        };
        for listener in &listeners {
            listener.after_shutdown();
        }
        info!(released, "registry shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counting {
        added: AtomicUsize,
        removed: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl RegistryListener for Counting {
        fn device_added(&self, _device: &Device) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn device_removed(&self, _device: &Device) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }

        fn after_shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lamp(udn: &str) -> Device {
        Device::new(udn, "urn:schemas-upnp-org:device:DimmableLight:1", "Lamp")
    }

    #[test]
    fn listeners_are_kept_once_and_notified() {
        let registry = LocalRegistry::with_settings(&RegistryConfig::default());
        let counting = Arc::new(Counting::default());
        let listener: Arc<dyn RegistryListener> = counting.clone();
        registry.add_listener(listener.clone());
        registry.add_listener(listener.clone());
        assert_eq!(registry.listeners().len(), 1);

        assert!(registry.add_device(lamp("uuid:a")).unwrap());
        assert!(!registry.add_device(lamp("uuid:a")).unwrap());
        assert!(registry.remove_device("uuid:a").unwrap().is_some());
        assert!(registry.remove_device("uuid:a").unwrap().is_none());
        assert_eq!(counting.added.load(Ordering::SeqCst), 1);
        assert_eq!(counting.removed.load(Ordering::SeqCst), 1);

        assert!(registry.remove_listener(&listener));
        assert!(!registry.remove_listener(&listener));
    }

    #[test]
    fn capacity_is_enforced() {
        let settings = RegistryConfig {
            max_devices: Some(1),
            ..RegistryConfig::default()
        };
        let registry = LocalRegistry::with_settings(&settings);
        registry.add_device(lamp("uuid:a")).unwrap();
        assert!(registry.add_device(lamp("uuid:b")).is_err());
        assert!(!registry.add_device(lamp("uuid:a")).unwrap());
    }

    #[test]
    fn stale_devices_expire_and_notify() {
        let settings = RegistryConfig {
            device_max_age: Duration::from_secs(60),
            ..RegistryConfig::default()
        };
        let registry = LocalRegistry::with_settings(&settings);
        let counting = Arc::new(Counting::default());
        registry.add_listener(counting.clone());
        let seen = lamp("uuid:a");
        let discovered_at = seen.discovered_at;
        registry.add_device(seen).unwrap();

        assert!(registry
            .expire_stale(discovered_at + chrono::Duration::seconds(30))
            .is_empty());
        let expired = registry.expire_stale(discovered_at + chrono::Duration::seconds(61));
        assert_eq!(expired.len(), 1);
        assert!(registry.devices().is_empty());
        assert_eq!(counting.removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn maintenance_thread_expires_and_stops_on_shutdown() {
        let settings = RegistryConfig {
            maintenance_interval: Duration::from_millis(10),
            device_max_age: Duration::from_millis(1),
            max_devices: None,
        };
        let registry = Arc::new(LocalRegistry::with_settings(&settings));
        let maintenance = registry.spawn_maintenance();
        registry.add_device(lamp("uuid:a")).unwrap();

        for _ in 0..200 {
            if registry.devices().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(registry.devices().is_empty());

        registry.shutdown().unwrap();
        maintenance.join().expect("maintenance thread exits");
    }

    #[test]
    fn shutdown_releases_devices_and_listeners() {
        let registry = LocalRegistry::with_settings(&RegistryConfig::default());
        let counting = Arc::new(Counting::default());
        registry.add_listener(counting.clone());
        registry.add_device(lamp("uuid:a")).unwrap();

        registry.shutdown().unwrap();
        registry.shutdown().unwrap();
        assert!(registry.is_shut_down());
        assert!(registry.devices().is_empty());
        assert!(registry.listeners().is_empty());
        assert_eq!(counting.shutdowns.load(Ordering::SeqCst), 1);
        assert!(registry.add_device(lamp("uuid:b")).is_err());
        assert!(registry.remove_device("uuid:a").is_err());
    }
}

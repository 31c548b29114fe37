//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Ordered lifecycle notifications published by the orchestrator.

use tokio::sync::broadcast;

use crate::subsystem::SubsystemKind;

const DEFAULT_CAPACITY: usize = 64;

/// Status change emitted while the service starts or shuts down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StartRequested,
    SubsystemCreated(SubsystemKind),
    DiscoveryListenerAttached,
    Started,
    StartFailed { stage: SubsystemKind, reason: String },
    ShutdownRequested,
    SubsystemStopped(SubsystemKind),
    Stopped,
}

/// Broadcast channel carrying [`LifecycleEvent`]s to any number of observers.
///
/// Publishing never blocks; observers that fall more than the channel capacity
/// behind lose the oldest events.
#[derive(Debug, Clone)]
pub struct LifecycleEvents {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleEvents {
    /// Create a bus retaining up to `capacity` events per lagging observer.
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_events_in_publish_order() {
        let events = LifecycleEvents::default();
        let mut rx = events.subscribe();
        events.publish(LifecycleEvent::StartRequested);
        events.publish(LifecycleEvent::SubsystemCreated(SubsystemKind::Registry));
        events.publish(LifecycleEvent::Started);

        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::StartRequested);
        assert_eq!(
            rx.try_recv().unwrap(),
            LifecycleEvent::SubsystemCreated(SubsystemKind::Registry)
        );
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::Started);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let events = LifecycleEvents::new(0);
        let mut rx = events.subscribe();
        events.publish(LifecycleEvent::Started);
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::Started);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let events = LifecycleEvents::new(4);
        events.publish(LifecycleEvent::Stopped);
    }
}

//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! The bridge service orchestrator.
//!
//! ## Startup order
//!
//! ```text
//! 1. Protocol handler
//! 2. Registry          (protocol handler)
//! 3. Router            (configuration, protocol handler, registry)
//! 4. Control point     (configuration, protocol handler, registry)
//! 5. Link manager      (service handle)
//! 6. Link manager discovery listener attached to the registry
//! ```
//!
//! ## Shutdown order
//!
//! Link manager, registry, router, then configuration. The control point has
//! no stop step.
//!
//! ## Thread safety
//!
//! Start, shutdown and configuration changes are serialized by one transition
//! lock. The running subsystem set is published as a whole once every step
//! succeeded, so accessors observe either no subsystems or all of them.

use std::sync::{Arc, Weak};

use bridge_logging::{bridge_debug, bridge_info, bridge_warn, log_system_event, LogContext, SystemEventOutcome};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::events::{LifecycleEvent, LifecycleEvents};
use crate::factory::SubsystemFactory;
use crate::subsystem::{
    ControlPoint, LinkManager, ProtocolHandler, Registry, Router, ServiceConfiguration,
    SubsystemError, SubsystemKind, SubsystemResult,
};

/// Lifecycle state derived from whether the subsystem set is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Idle,
    Running,
}

/// The subsystem instances of one run.
#[derive(Debug, Clone)]
pub struct Subsystems {
    pub protocol_handler: Arc<dyn ProtocolHandler>,
    pub registry: Arc<dyn Registry>,
    pub router: Arc<dyn Router>,
    pub control_point: Arc<dyn ControlPoint>,
    pub link_manager: Arc<dyn LinkManager>,
}

/// Read access to the service's configuration and subsystems.
///
/// Implemented by [`BridgeService`] and by the non-owning [`ServiceHandle`]
/// given to factories.
pub trait ServiceContext: Send + Sync {
    fn configuration(&self) -> Option<Arc<dyn ServiceConfiguration>>;
    fn protocol_handler(&self) -> Option<Arc<dyn ProtocolHandler>>;
    fn registry(&self) -> Option<Arc<dyn Registry>>;
    fn router(&self) -> Option<Arc<dyn Router>>;
    fn control_point(&self) -> Option<Arc<dyn ControlPoint>>;
}

#[derive(Debug, Default)]
struct ServiceState {
    configuration: Option<Arc<dyn ServiceConfiguration>>,
    // Registry and router are present together or absent together.
    running: Option<Subsystems>,
}

#[derive(Debug)]
struct ServiceShared {
    factory: SubsystemFactory,
    transition: Mutex<()>,
    state: RwLock<ServiceState>,
    events: LifecycleEvents,
}

impl ServiceShared {
    fn configuration(&self) -> Option<Arc<dyn ServiceConfiguration>> {
        self.state.read().configuration.clone()
    }

    fn subsystems(&self) -> Option<Subsystems> {
        self.state.read().running.clone()
    }

    fn running<T>(&self, select: impl FnOnce(&Subsystems) -> T) -> Option<T> {
        self.state.read().running.as_ref().map(select)
    }
}

/// Non-owning handle to a [`BridgeService`].
///
/// Factories receive it so subsystems can look up their siblings later on.
/// Subsystems become visible through the handle once `start()` has
/// completed; while the factories run it still reports the previous (idle)
/// state. Every accessor returns `None` after the service is dropped.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    shared: Weak<ServiceShared>,
}

impl ServiceHandle {
    /// Handle that is not attached to any service.
    pub fn detached() -> Self {
        Self {
            shared: Weak::new(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }

    fn with_shared<T>(&self, read: impl FnOnce(&ServiceShared) -> Option<T>) -> Option<T> {
        self.shared.upgrade().and_then(|shared| read(&shared))
    }
}

impl ServiceContext for ServiceHandle {
    fn configuration(&self) -> Option<Arc<dyn ServiceConfiguration>> {
        self.with_shared(ServiceShared::configuration)
    }

    fn protocol_handler(&self) -> Option<Arc<dyn ProtocolHandler>> {
        self.with_shared(|shared| shared.running(|s| s.protocol_handler.clone()))
    }

    fn registry(&self) -> Option<Arc<dyn Registry>> {
        self.with_shared(|shared| shared.running(|s| s.registry.clone()))
    }

    fn router(&self) -> Option<Arc<dyn Router>> {
        self.with_shared(|shared| shared.running(|s| s.router.clone()))
    }

    fn control_point(&self) -> Option<Arc<dyn ControlPoint>> {
        self.with_shared(|shared| shared.running(|s| s.control_point.clone()))
    }
}

/// Failure of one startup step, remembered for the lifecycle event.
struct StartFailure {
    stage: SubsystemKind,
    error: SubsystemError,
}

/// Owns the subsystems of the bridge and drives their start/stop sequence.
///
/// Cloning yields another reference to the same service.
#[derive(Debug, Clone)]
pub struct BridgeService {
    shared: Arc<ServiceShared>,
}

impl BridgeService {
    /// Create an idle service without configuration.
    pub fn new(factory: SubsystemFactory) -> Self {
        Self {
            shared: Arc::new(ServiceShared {
                factory,
                transition: Mutex::new(()),
                state: RwLock::new(ServiceState::default()),
                events: LifecycleEvents::default(),
            }),
        }
    }

    /// Create an idle service with its configuration already supplied.
    pub fn with_configuration(
        factory: SubsystemFactory,
        configuration: Arc<dyn ServiceConfiguration>,
    ) -> Self {
        let service = Self::new(factory);
        service.shared.state.write().configuration = Some(configuration);
        service
    }

    /// Create every subsystem in dependency order and wire the link manager's
    /// discovery listener into the registry.
    ///
    /// Fails with [`ServiceError::ConfigurationMissing`] or
    /// [`ServiceError::AlreadyRunning`] without touching any state. A failing
    /// factory leaves the service idle; the registry and router built before
    /// the failure are stopped on a best-effort basis.
    pub fn start(&self) -> Result<(), ServiceError> {
        let _transition = self.shared.transition.lock();
        let configuration = {
            let state = self.shared.state.read();
            let Some(configuration) = state.configuration.clone() else {
                return Err(ServiceError::ConfigurationMissing);
            };
            if state.running.is_some() {
                return Err(ServiceError::AlreadyRunning);
            }
            configuration
        };

        let ctx = LogContext::new()
            .with_service(configuration.name())
            .with_phase("start");
        self.shared.events.publish(LifecycleEvent::StartRequested);
        bridge_info!(context = ctx, ">>> starting bridge service");
        info!(configuration = %configuration.name(), "using configuration");

        match self.build_subsystems(&configuration, &ctx) {
            Ok(subsystems) => {
                self.shared.state.write().running = Some(subsystems);
                self.shared.events.publish(LifecycleEvent::Started);
                log_system_event(
                    Some(&ctx),
                    "service.start",
                    "<<< bridge service started successfully",
                    SystemEventOutcome::Success,
                );
                Ok(())
            }
            Err(failure) => {
                self.shared.events.publish(LifecycleEvent::StartFailed {
                    stage: failure.stage,
                    reason: failure.error.to_string(),
                });
                log_system_event(
                    Some(&ctx.clone().with_subsystem(failure.stage.as_str())),
                    "service.start",
                    &format!("bridge service failed to start: {}", failure.error),
                    SystemEventOutcome::Fault,
                );
                Err(failure.error.into())
            }
        }
    }

    /// Stop the link manager, registry, router, and configuration, in that order.
    ///
    /// A no-op when the service is idle. Every stop step is attempted even if
    /// an earlier one fails; the first failure is returned. The service is
    /// idle afterwards either way.
    pub fn shutdown(&self) -> Result<(), ServiceError> {
        let _transition = self.shared.transition.lock();
        let (subsystems, configuration) = {
            let state = self.shared.state.read();
            let Some(subsystems) = state.running.clone() else {
                return Ok(());
            };
            (subsystems, state.configuration.clone())
        };

        let service_name = configuration
            .as_ref()
            .map(|configuration| configuration.name().to_owned())
            .unwrap_or_default();
        let ctx = LogContext::new()
            .with_service(&service_name)
            .with_phase("shutdown");
        self.shared.events.publish(LifecycleEvent::ShutdownRequested);
        bridge_info!(context = ctx, ">>> shutting down bridge service");

        let mut first_error: Option<SubsystemError> = None;
        self.stop_step(SubsystemKind::LinkManager, 1, &ctx, &mut first_error, || {
            subsystems.link_manager.shutdown()
        });
        self.stop_step(SubsystemKind::Registry, 2, &ctx, &mut first_error, || {
            subsystems.registry.shutdown()
        });
        self.stop_step(SubsystemKind::Router, 3, &ctx, &mut first_error, || {
            subsystems.router.shutdown()
        });
        if let Some(configuration) = &configuration {
            self.stop_step(SubsystemKind::Configuration, 4, &ctx, &mut first_error, || {
                configuration.shutdown()
            });
        }

        self.shared.state.write().running = None;
        self.shared.events.publish(LifecycleEvent::Stopped);

        match first_error {
            None => {
                log_system_event(
                    Some(&ctx),
                    "service.shutdown",
                    "<<< bridge service shutdown completed",
                    SystemEventOutcome::Success,
                );
                Ok(())
            }
            Some(error) => {
                log_system_event(
                    Some(&ctx),
                    "service.shutdown",
                    &format!("bridge service shutdown completed with errors: {}", error),
                    SystemEventOutcome::Fault,
                );
                Err(error.into())
            }
        }
    }

    /// Replace the configuration. Takes effect on the next `start()`.
    pub fn set_configuration(&self, configuration: Arc<dyn ServiceConfiguration>) {
        let _transition = self.shared.transition.lock();
        let mut state = self.shared.state.write();
        if state.running.is_some() {
            warn!(
                configuration = %configuration.name(),
                "configuration replaced while running; restart the service to apply it"
            );
        }
        state.configuration = Some(configuration);
    }

    pub fn configuration(&self) -> Option<Arc<dyn ServiceConfiguration>> {
        self.shared.configuration()
    }

    pub fn protocol_handler(&self) -> Option<Arc<dyn ProtocolHandler>> {
        self.shared.running(|s| s.protocol_handler.clone())
    }

    pub fn registry(&self) -> Option<Arc<dyn Registry>> {
        self.shared.running(|s| s.registry.clone())
    }

    pub fn router(&self) -> Option<Arc<dyn Router>> {
        self.shared.running(|s| s.router.clone())
    }

    pub fn control_point(&self) -> Option<Arc<dyn ControlPoint>> {
        self.shared.running(|s| s.control_point.clone())
    }

    pub fn link_manager(&self) -> Option<Arc<dyn LinkManager>> {
        self.shared.running(|s| s.link_manager.clone())
    }

    /// Consistent snapshot of every running subsystem.
    pub fn subsystems(&self) -> Option<Subsystems> {
        self.shared.subsystems()
    }

    pub fn status(&self) -> ServiceStatus {
        if self.shared.state.read().running.is_some() {
            ServiceStatus::Running
        } else {
            ServiceStatus::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == ServiceStatus::Running
    }

    /// Non-owning handle for collaborators that must not keep the service alive.
    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Observe lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.events.subscribe()
    }

    fn build_subsystems(
        &self,
        configuration: &Arc<dyn ServiceConfiguration>,
        ctx: &LogContext,
    ) -> Result<Subsystems, StartFailure> {
        let factory = &self.shared.factory;
        let handle = self.handle();

        let protocol_handler = self.create_step(SubsystemKind::ProtocolHandler, 1, ctx, || {
            factory.create_protocol_handler(&handle)
        })?;
        let registry = self.create_step(SubsystemKind::Registry, 2, ctx, || {
            factory.create_registry(&handle, &protocol_handler)
        })?;
        // The router may receive network events right away; the registry must exist first.
        let router = self
            .create_step(SubsystemKind::Router, 3, ctx, || {
                factory.create_router(configuration, &protocol_handler, &registry)
            })
            .map_err(|failure| release_partial(failure, ctx, &registry, None))?;
        let control_point = self
            .create_step(SubsystemKind::ControlPoint, 4, ctx, || {
                factory.create_control_point(configuration, &protocol_handler, &registry)
            })
            .map_err(|failure| release_partial(failure, ctx, &registry, Some(&router)))?;
        let link_manager = self
            .create_step(SubsystemKind::LinkManager, 5, ctx, || {
                factory.create_link_manager(&handle)
            })
            .map_err(|failure| release_partial(failure, ctx, &registry, Some(&router)))?;

        registry.add_listener(link_manager.device_discovery());
        self.shared
            .events
            .publish(LifecycleEvent::DiscoveryListenerAttached);
        bridge_debug!(
            context = ctx.clone().with_sequence(6),
            "link manager discovery listener attached to registry"
        );

        Ok(Subsystems {
            protocol_handler,
            registry,
            router,
            control_point,
            link_manager,
        })
    }

    fn create_step<T>(
        &self,
        kind: SubsystemKind,
        sequence: u64,
        ctx: &LogContext,
        create: impl FnOnce() -> SubsystemResult<T>,
    ) -> Result<T, StartFailure> {
        let created = create().map_err(|error| StartFailure { stage: kind, error })?;
        self.shared
            .events
            .publish(LifecycleEvent::SubsystemCreated(kind));
        bridge_debug!(
            context = ctx.clone().with_subsystem(kind.as_str()).with_sequence(sequence),
            "{} created",
            kind
        );
        Ok(created)
    }

    fn stop_step(
        &self,
        kind: SubsystemKind,
        sequence: u64,
        ctx: &LogContext,
        first_error: &mut Option<SubsystemError>,
        stop: impl FnOnce() -> SubsystemResult<()>,
    ) {
        let step_ctx = ctx.clone().with_subsystem(kind.as_str()).with_sequence(sequence);
        match stop() {
            Ok(()) => {
                bridge_debug!(context = step_ctx, "{} stopped", kind);
            }
            Err(error) => {
                bridge_warn!(context = step_ctx, "{} failed to stop: {}", kind, error);
                first_error.get_or_insert(error);
            }
        }
        self.shared
            .events
            .publish(LifecycleEvent::SubsystemStopped(kind));
    }
}

impl Default for BridgeService {
    fn default() -> Self {
        Self::new(SubsystemFactory::local())
    }
}

impl ServiceContext for BridgeService {
    fn configuration(&self) -> Option<Arc<dyn ServiceConfiguration>> {
        BridgeService::configuration(self)
    }

    fn protocol_handler(&self) -> Option<Arc<dyn ProtocolHandler>> {
        BridgeService::protocol_handler(self)
    }

    fn registry(&self) -> Option<Arc<dyn Registry>> {
        BridgeService::registry(self)
    }

    fn router(&self) -> Option<Arc<dyn Router>> {
        BridgeService::router(self)
    }

    fn control_point(&self) -> Option<Arc<dyn ControlPoint>> {
        BridgeService::control_point(self)
    }
}

/// Stop what a failed start already built, registry before router.
fn release_partial(
    failure: StartFailure,
    ctx: &LogContext,
    registry: &Arc<dyn Registry>,
    router: Option<&Arc<dyn Router>>,
) -> StartFailure {
    if let Err(err) = registry.shutdown() {
        bridge_warn!(
            context = ctx.clone().with_subsystem(SubsystemKind::Registry.as_str()),
            "failed to release registry after aborted start: {}",
            err
        );
    }
    if let Some(router) = router {
        if let Err(err) = router.shutdown() {
            bridge_warn!(
                context = ctx.clone().with_subsystem(SubsystemKind::Router.as_str()),
                "failed to release router after aborted start: {}",
                err
            );
        }
    }
    failure
}

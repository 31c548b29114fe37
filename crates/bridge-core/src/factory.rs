//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Injectable constructors for the orchestrated subsystems.

use std::fmt;
use std::sync::Arc;

use crate::local::{
    BridgeProtocolHandler, LocalControlPoint, LocalLinkManager, LocalRegistry, LocalRouter,
};
use crate::service::ServiceHandle;
use crate::subsystem::{
    ControlPoint, LinkManager, ProtocolHandler, Registry, Router, ServiceConfiguration,
    SubsystemResult,
};

// Type aliases for factory functions
type ProtocolHandlerFactory =
    Box<dyn Fn(&ServiceHandle) -> SubsystemResult<Arc<dyn ProtocolHandler>> + Send + Sync>;
type RegistryFactory = Box<
    dyn Fn(&ServiceHandle, &Arc<dyn ProtocolHandler>) -> SubsystemResult<Arc<dyn Registry>>
        + Send
        + Sync,
>;
type RouterFactory = Box<
    dyn Fn(
            &Arc<dyn ServiceConfiguration>,
            &Arc<dyn ProtocolHandler>,
            &Arc<dyn Registry>,
        ) -> SubsystemResult<Arc<dyn Router>>
        + Send
        + Sync,
>;
type ControlPointFactory = Box<
    dyn Fn(
            &Arc<dyn ServiceConfiguration>,
            &Arc<dyn ProtocolHandler>,
            &Arc<dyn Registry>,
        ) -> SubsystemResult<Arc<dyn ControlPoint>>
        + Send
        + Sync,
>;
type LinkManagerFactory =
    Box<dyn Fn(&ServiceHandle) -> SubsystemResult<Arc<dyn LinkManager>> + Send + Sync>;

/// Set of constructors the orchestrator calls, in dependency order, on every start.
///
/// Each constructor can be replaced independently so alternate implementations
/// slot in without touching the orchestration logic.
pub struct SubsystemFactory {
    protocol_handler: ProtocolHandlerFactory,
    registry: RegistryFactory,
    router: RouterFactory,
    control_point: ControlPointFactory,
    link_manager: LinkManagerFactory,
}

impl SubsystemFactory {
    /// Factory producing the in-memory implementations from [`crate::local`].
    pub fn local() -> Self {
        Self {
            protocol_handler: Box::new(local_protocol_handler),
            registry: Box::new(local_registry),
            router: Box::new(local_router),
            control_point: Box::new(local_control_point),
            link_manager: Box::new(local_link_manager),
        }
    }

    pub fn with_protocol_handler_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ServiceHandle) -> SubsystemResult<Arc<dyn ProtocolHandler>> + Send + Sync + 'static,
    {
        self.protocol_handler = Box::new(factory);
        self
    }

    pub fn with_registry_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ServiceHandle, &Arc<dyn ProtocolHandler>) -> SubsystemResult<Arc<dyn Registry>>
            + Send
            + Sync
            + 'static,
    {
        self.registry = Box::new(factory);
        self
    }

    pub fn with_router_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(
                &Arc<dyn ServiceConfiguration>,
                &Arc<dyn ProtocolHandler>,
                &Arc<dyn Registry>,
            ) -> SubsystemResult<Arc<dyn Router>>
            + Send
            + Sync
            + 'static,
    {
        self.router = Box::new(factory);
        self
    }

    pub fn with_control_point_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(
                &Arc<dyn ServiceConfiguration>,
                &Arc<dyn ProtocolHandler>,
                &Arc<dyn Registry>,
            ) -> SubsystemResult<Arc<dyn ControlPoint>>
            + Send
            + Sync
            + 'static,
    {
        self.control_point = Box::new(factory);
        self
    }

    pub fn with_link_manager_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ServiceHandle) -> SubsystemResult<Arc<dyn LinkManager>> + Send + Sync + 'static,
    {
        self.link_manager = Box::new(factory);
        self
    }

    pub(crate) fn create_protocol_handler(
        &self,
        handle: &ServiceHandle,
    ) -> SubsystemResult<Arc<dyn ProtocolHandler>> {
        (self.protocol_handler)(handle)
    }

    pub(crate) fn create_registry(
        &self,
        handle: &ServiceHandle,
        protocol: &Arc<dyn ProtocolHandler>,
    ) -> SubsystemResult<Arc<dyn Registry>> {
        (self.registry)(handle, protocol)
    }

    pub(crate) fn create_router(
        &self,
        configuration: &Arc<dyn ServiceConfiguration>,
        protocol: &Arc<dyn ProtocolHandler>,
        registry: &Arc<dyn Registry>,
    ) -> SubsystemResult<Arc<dyn Router>> {
        (self.router)(configuration, protocol, registry)
    }

    pub(crate) fn create_control_point(
        &self,
        configuration: &Arc<dyn ServiceConfiguration>,
        protocol: &Arc<dyn ProtocolHandler>,
        registry: &Arc<dyn Registry>,
    ) -> SubsystemResult<Arc<dyn ControlPoint>> {
        (self.control_point)(configuration, protocol, registry)
    }

    pub(crate) fn create_link_manager(
        &self,
        handle: &ServiceHandle,
    ) -> SubsystemResult<Arc<dyn LinkManager>> {
        (self.link_manager)(handle)
    }
}

fn local_protocol_handler(handle: &ServiceHandle) -> SubsystemResult<Arc<dyn ProtocolHandler>> {
    Ok(Arc::new(BridgeProtocolHandler::new(handle)?))
}

fn local_registry(
    handle: &ServiceHandle,
    _protocol: &Arc<dyn ProtocolHandler>,
) -> SubsystemResult<Arc<dyn Registry>> {
    let registry = Arc::new(LocalRegistry::new(handle)?);
    registry.spawn_maintenance();
    let registry: Arc<dyn Registry> = registry;
    Ok(registry)
}

fn local_router(
    configuration: &Arc<dyn ServiceConfiguration>,
    protocol: &Arc<dyn ProtocolHandler>,
    registry: &Arc<dyn Registry>,
) -> SubsystemResult<Arc<dyn Router>> {
    Ok(Arc::new(LocalRouter::new(
        configuration.as_ref(),
        protocol.clone(),
        registry.clone(),
    )))
}

fn local_control_point(
    configuration: &Arc<dyn ServiceConfiguration>,
    protocol: &Arc<dyn ProtocolHandler>,
    registry: &Arc<dyn Registry>,
) -> SubsystemResult<Arc<dyn ControlPoint>> {
    Ok(Arc::new(LocalControlPoint::new(
        configuration.as_ref(),
        protocol.clone(),
        registry.clone(),
    )))
}

fn local_link_manager(handle: &ServiceHandle) -> SubsystemResult<Arc<dyn LinkManager>> {
    Ok(Arc::new(LocalLinkManager::new(handle.clone())))
}

impl Default for SubsystemFactory {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Debug for SubsystemFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemFactory").finish_non_exhaustive()
    }
}

//! ---
//! bridge_section: "02-orchestration"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Lifecycle orchestration of the bridge subsystems."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! In-memory subsystem implementations wired by [`crate::SubsystemFactory::local`].

mod configuration;
mod control_point;
mod link;
mod protocol;
mod registry;
mod router;

pub use configuration::LocalConfiguration;
pub use control_point::LocalControlPoint;
pub use link::{Announcement, AnnouncementKind, DeviceDiscovery, LinkEndpoint, LocalLinkManager};
pub use protocol::BridgeProtocolHandler;
pub use registry::LocalRegistry;
pub use router::LocalRouter;

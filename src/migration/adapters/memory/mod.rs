//! In-memory adapters for migration storage, hosts, and the mirror tool.

mod hosts;
mod mirror;
mod registry;

pub use hosts::{InMemorySourceHost, InMemoryTargetHost};
pub use mirror::{InMemoryMirrorTool, MirrorTransfer};
pub use registry::InMemoryMigrationRegistry;

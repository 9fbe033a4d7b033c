//! Port contracts for repository migrations.
//!
//! Ports define infrastructure-agnostic interfaces used by migration
//! services: the record registry, credential unwrapping, both remote hosts,
//! and the local mirror tool.

pub mod credentials;
pub mod mirror;
pub mod registry;
pub mod source_host;
pub mod target_host;

pub use credentials::{CredentialError, CredentialResult, CredentialUnwrapper};
pub use mirror::{MirrorError, MirrorOperation, MirrorResult, MirrorTool};
pub use registry::{MigrationRegistry, RegistryError, RegistryResult};
pub use source_host::{SourceHost, SourceHostError, SourceHostResult, SourceRepository};
pub use target_host::{
    RepositoryCreation, TargetHost, TargetHostError, TargetHostResult, TargetRepositorySummary,
};

#[cfg(test)]
pub use source_host::MockSourceHost;
#[cfg(test)]
pub use target_host::MockTargetHost;

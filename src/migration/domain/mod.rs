//! Domain model for repository migrations.
//!
//! The migration domain models the record a poller observes, its status
//! state machine, the locators of both repositories, and the sealed
//! credentials bound to a transfer, while keeping hosts, processes, and
//! storage outside of the domain boundary.

mod credential;
mod error;
mod ids;
mod location;
mod name;
mod record;

pub use credential::{AuthenticatedUrl, MigrationCredentials, SealedCredential};
pub use error::{MigrationDomainError, ParseMigrationStatusError};
pub use ids::{Checkpoint, MigrationId, Progress};
pub use location::{SourceLocation, TargetLocation, TargetNamespace};
pub use name::TargetRepositoryName;
pub use record::{MigrationRecord, MigrationStatus, NewMigration, PersistedMigrationData};

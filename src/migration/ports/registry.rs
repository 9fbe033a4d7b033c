//! Registry port for migration record persistence and lookup.

use crate::migration::domain::{MigrationId, MigrationRecord, NewMigration};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for migration registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Migration record store.
///
/// The registry owns every record. Implementations must replace whole
/// records atomically so that a reader never observes a partially applied
/// update.
#[async_trait]
pub trait MigrationRegistry: Send + Sync {
    /// Assigns the next identifier and stores a `pending` record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] when the record cannot be
    /// stored.
    async fn create(&self, new_migration: NewMigration) -> RegistryResult<MigrationRecord>;

    /// Replaces an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the record does not exist.
    async fn update(&self, record: &MigrationRecord) -> RegistryResult<()>;

    /// Finds a record by identifier.
    ///
    /// Returns `None` when the record does not exist.
    async fn find_by_id(&self, id: MigrationId) -> RegistryResult<Option<MigrationRecord>>;

    /// Returns every record in creation order.
    async fn list(&self) -> RegistryResult<Vec<MigrationRecord>>;
}

/// Errors returned by migration registry implementations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The migration was not found.
    #[error("migration not found: {0}")]
    NotFound(MigrationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RegistryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

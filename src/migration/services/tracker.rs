//! Status tracker: the only writer of migration records after creation.
//!
//! Every operation reads the current record, applies one validated change
//! and writes the whole record back. Writes for the same migration are
//! serialised by a per-id async mutex so that no read-modify-write cycle
//! interleaves with another; different migrations never contend.

use crate::migration::{
    domain::{MigrationDomainError, MigrationId, MigrationRecord, MigrationStatus, Progress},
    ports::{MigrationRegistry, RegistryError},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by [`StatusTracker`] operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No record exists for the identifier.
    #[error("migration {0} not found")]
    NotFound(MigrationId),

    /// The requested change violates the record's invariants.
    #[error(transparent)]
    Domain(#[from] MigrationDomainError),

    /// The registry failed.
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for TrackerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(id),
            RegistryError::Persistence(_) => Self::Registry(err),
        }
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

type LockTable = HashMap<MigrationId, Arc<tokio::sync::Mutex<()>>>;

/// Serialised single-field mutators over migration records.
pub struct StatusTracker<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    clock: Arc<C>,
    locks: Arc<Mutex<LockTable>>,
}

impl<R, C> Clone for StatusTracker<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<R, C> StatusTracker<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    /// Creates a tracker over `registry`.
    #[must_use]
    pub fn new(registry: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            registry,
            clock,
            locks: Arc::default(),
        }
    }

    /// Returns the committed record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] for unknown ids and
    /// [`TrackerError::Registry`] when the lookup fails.
    pub async fn get(&self, id: MigrationId) -> TrackerResult<MigrationRecord> {
        self.registry
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::NotFound(id))
    }

    /// Moves the record to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] for forbidden transitions and for
    /// `failed`, which needs a description (see [`Self::set_error`]).
    pub async fn set_status(
        &self,
        id: MigrationId,
        status: MigrationStatus,
    ) -> TrackerResult<MigrationRecord> {
        let record = self
            .mutate(id, |record, clock| record.transition_to(status, clock))
            .await?;
        info!(migration_id = %id, %status, "migration status changed");
        Ok(record)
    }

    /// Records a progress checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] unless the record is `in_progress`
    /// and `progress` does not regress.
    pub async fn set_progress(
        &self,
        id: MigrationId,
        progress: Progress,
    ) -> TrackerResult<MigrationRecord> {
        let record = self
            .mutate(id, |record, clock| record.advance_progress(progress, clock))
            .await?;
        debug!(migration_id = %id, %progress, "migration progress changed");
        Ok(record)
    }

    /// Marks the migration `failed` with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] for a blank message or a terminal
    /// record.
    pub async fn set_error(
        &self,
        id: MigrationId,
        message: impl Into<String> + Send,
    ) -> TrackerResult<MigrationRecord> {
        let description = message.into();
        let record = self
            .mutate(id, |record, clock| record.fail(description, clock))
            .await?;
        info!(migration_id = %id, "migration failed");
        Ok(record)
    }

    /// Moves the migration to `cancelled`.
    ///
    /// A running transfer notices at its next checkpoint and stops.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] when the record is already terminal.
    pub async fn cancel(&self, id: MigrationId) -> TrackerResult<MigrationRecord> {
        self.set_status(id, MigrationStatus::Cancelled).await
    }

    async fn mutate<F>(&self, id: MigrationId, apply: F) -> TrackerResult<MigrationRecord>
    where
        F: FnOnce(&mut MigrationRecord, &C) -> Result<(), MigrationDomainError> + Send,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut record = self.get(id).await?;
        apply(&mut record, &*self.clock)?;
        self.registry.update(&record).await?;

        if record.status().is_terminal() {
            self.forget_lock(id);
        }
        Ok(record)
    }

    fn lock_for(&self, id: MigrationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    // Terminal records reject every further change, so a fresh lock created
    // after removal cannot admit a conflicting write.
    fn forget_lock(&self, id: MigrationId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(&id);
    }
}

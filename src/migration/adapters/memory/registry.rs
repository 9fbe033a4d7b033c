//! In-memory migration registry for single-process deployments and tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::migration::{
    domain::{MigrationId, MigrationRecord, NewMigration},
    ports::{MigrationRegistry, RegistryError, RegistryResult},
};

/// Thread-safe in-memory migration registry.
///
/// Records are keyed by identifier in a `BTreeMap`, so iteration order is
/// creation order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMigrationRegistry {
    state: Arc<RwLock<InMemoryRegistryState>>,
}

#[derive(Debug, Default)]
struct InMemoryRegistryState {
    records: BTreeMap<MigrationId, MigrationRecord>,
    last_id: u64,
}

impl InMemoryMigrationRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> RegistryError {
    RegistryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl MigrationRegistry for InMemoryMigrationRegistry {
    async fn create(&self, new_migration: NewMigration) -> RegistryResult<MigrationRecord> {
        let mut state = self.state.write().map_err(lock_error)?;
        let next = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| lock_error("migration identifier space exhausted"))?;
        state.last_id = next;

        let record = MigrationRecord::create(MigrationId::new(next), new_migration);
        state.records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn update(&self, record: &MigrationRecord) -> RegistryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let slot = state
            .records
            .get_mut(&record.id())
            .ok_or(RegistryError::NotFound(record.id()))?;
        *slot = record.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: MigrationId) -> RegistryResult<Option<MigrationRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.records.get(&id).cloned())
    }

    async fn list(&self) -> RegistryResult<Vec<MigrationRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.records.values().cloned().collect())
    }
}

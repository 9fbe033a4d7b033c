//! `PostgreSQL` registry implementation for migration records.

use super::{
    models::{MigrationChangeset, MigrationRow, NewMigrationRow},
    schema::migrations,
};
use crate::migration::{
    domain::{
        MigrationCredentials, MigrationId, MigrationRecord, MigrationStatus, NewMigration,
        PersistedMigrationData, Progress, SealedCredential, SourceLocation, TargetLocation,
    },
    ports::{MigrationRegistry, RegistryError, RegistryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by the migration registry.
pub type MigrationPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed migration registry.
#[derive(Debug, Clone)]
pub struct PostgresMigrationRegistry {
    pool: MigrationPgPool,
}

impl PostgresMigrationRegistry {
    /// Creates a new registry from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MigrationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RegistryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RegistryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RegistryError::persistence)?
    }
}

#[async_trait]
impl MigrationRegistry for PostgresMigrationRegistry {
    async fn create(&self, new_migration: NewMigration) -> RegistryResult<MigrationRecord> {
        let new_row = to_new_row(&new_migration);
        let row = self
            .run_blocking(move |connection| {
                diesel::insert_into(migrations::table)
                    .values(&new_row)
                    .returning(MigrationRow::as_returning())
                    .get_result::<MigrationRow>(connection)
                    .map_err(RegistryError::persistence)
            })
            .await?;
        let id = row_id(row.id)?;
        Ok(MigrationRecord::create(id, new_migration))
    }

    async fn update(&self, record: &MigrationRecord) -> RegistryResult<()> {
        let id = record.id();
        let key = i64::try_from(id.value()).map_err(RegistryError::persistence)?;
        let changeset = to_changeset(record);

        self.run_blocking(move |connection| {
            let affected = diesel::update(migrations::table.filter(migrations::id.eq(key)))
                .set(&changeset)
                .execute(connection)
                .map_err(RegistryError::persistence)?;
            if affected == 0 {
                return Err(RegistryError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: MigrationId) -> RegistryResult<Option<MigrationRecord>> {
        let Ok(key) = i64::try_from(id.value()) else {
            return Ok(None);
        };
        self.run_blocking(move |connection| {
            let row = migrations::table
                .filter(migrations::id.eq(key))
                .select(MigrationRow::as_select())
                .first::<MigrationRow>(connection)
                .optional()
                .map_err(RegistryError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn list(&self) -> RegistryResult<Vec<MigrationRecord>> {
        self.run_blocking(|connection| {
            migrations::table
                .order(migrations::id.asc())
                .select(MigrationRow::as_select())
                .load::<MigrationRow>(connection)
                .map_err(RegistryError::persistence)?
                .into_iter()
                .map(row_to_record)
                .collect()
        })
        .await
    }
}

fn row_id(raw: i64) -> RegistryResult<MigrationId> {
    u64::try_from(raw)
        .map(MigrationId::new)
        .map_err(RegistryError::persistence)
}

fn to_new_row(new_migration: &NewMigration) -> NewMigrationRow {
    let credentials = new_migration.credentials();
    NewMigrationRow {
        source_location: new_migration.source().to_string(),
        target_location: new_migration.target().to_string(),
        status: MigrationStatus::Pending.as_str().to_owned(),
        progress: i16::from(Progress::NONE.value()),
        source_credential: credentials.source().as_str().to_owned(),
        target_credential: credentials.target().as_str().to_owned(),
        created_at: new_migration.requested_at(),
        updated_at: new_migration.requested_at(),
    }
}

fn to_changeset(record: &MigrationRecord) -> MigrationChangeset {
    MigrationChangeset {
        status: record.status().as_str().to_owned(),
        progress: i16::from(record.progress().value()),
        error: record.error().map(str::to_owned),
        started_at: record.started_at(),
        completed_at: record.completed_at(),
        updated_at: record.updated_at(),
    }
}

fn row_to_record(row: MigrationRow) -> RegistryResult<MigrationRecord> {
    let MigrationRow {
        id,
        source_location,
        target_location,
        status: persisted_status,
        progress: persisted_progress,
        error,
        source_credential,
        target_credential,
        started_at,
        completed_at,
        created_at,
        updated_at,
    } = row;

    let status = MigrationStatus::try_from(persisted_status.as_str())
        .map_err(RegistryError::persistence)?;
    let progress = u8::try_from(persisted_progress)
        .map_err(RegistryError::persistence)
        .and_then(|value| Progress::new(value).map_err(RegistryError::persistence))?;
    let credentials = MigrationCredentials::new(
        SealedCredential::new(source_credential).map_err(RegistryError::persistence)?,
        SealedCredential::new(target_credential).map_err(RegistryError::persistence)?,
    );

    let data = PersistedMigrationData {
        id: row_id(id)?,
        source: SourceLocation::parse(source_location).map_err(RegistryError::persistence)?,
        target: TargetLocation::parse(target_location).map_err(RegistryError::persistence)?,
        status,
        progress,
        error,
        started_at,
        completed_at,
        created_at,
        updated_at,
        credentials,
    };
    Ok(MigrationRecord::from_persisted(data))
}

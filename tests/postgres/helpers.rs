//! Shared test helpers for `PostgreSQL` integration tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mirrorshift::migration::{
    adapters::postgres::PostgresMigrationRegistry,
    domain::{
        MigrationCredentials, NewMigration, SealedCredential, SourceLocation, TargetLocation,
    },
};
use mockable::DefaultClock;

/// Boxed error type for helper results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Environment variable naming the test database.
pub const DATABASE_URL_VAR: &str = "MIRRORSHIFT_TEST_DATABASE_URL";

/// SQL that drops the schema.
pub const DROP_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_migrations/down.sql");

/// SQL that creates the schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_migrations/up.sql");

static SCHEMA_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Registry over a freshly recreated schema plus the lock serialising tests.
pub struct TestRegistry {
    pub registry: PostgresMigrationRegistry,
    _lock: MutexGuard<'static, ()>,
}

/// Connects to the test database and recreates the schema.
///
/// Returns `Ok(None)` when no database is configured.
///
/// # Errors
///
/// Returns an error if connecting or applying the schema fails.
pub fn fresh_registry() -> Result<Option<TestRegistry>, BoxError> {
    let Some(raw_url) = std::env::var_os(DATABASE_URL_VAR) else {
        return Ok(None);
    };
    let url = raw_url
        .into_string()
        .map_err(|_| format!("{DATABASE_URL_VAR} is not valid UTF-8"))?;
    let lock = SCHEMA_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let pool = Pool::builder()
        .max_size(4)
        .build(ConnectionManager::<PgConnection>::new(url))?;
    let mut connection = pool.get()?;
    connection.batch_execute(DROP_SCHEMA_SQL)?;
    connection.batch_execute(CREATE_SCHEMA_SQL)?;
    drop(connection);

    Ok(Some(TestRegistry {
        registry: PostgresMigrationRegistry::new(pool),
        _lock: lock,
    }))
}

/// Builds a pending migration for `source`.
///
/// # Errors
///
/// Returns an error if a location or credential is rejected.
pub fn new_migration(source: &str, target: &str) -> Result<NewMigration, BoxError> {
    let credentials = MigrationCredentials::new(
        SealedCredential::new("c2VhbGVkLXNvdXJjZS1jcmVkZW50aWFs")?,
        SealedCredential::new("c2VhbGVkLXRhcmdldC1jcmVkZW50aWFs")?,
    );
    Ok(NewMigration::new(
        SourceLocation::parse(source)?,
        TargetLocation::parse(target)?,
        credentials,
        &DefaultClock,
    ))
}

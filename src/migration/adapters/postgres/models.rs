//! Diesel row models for migration persistence.

use super::schema::migrations;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for migration records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = migrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MigrationRow {
    /// Sequential migration identifier.
    pub id: i64,
    /// Source location string.
    pub source_location: String,
    /// Target location string.
    pub target_location: String,
    /// Lifecycle status.
    pub status: String,
    /// Percentage complete.
    pub progress: i16,
    /// Failure description.
    pub error: Option<String>,
    /// Sealed source credential.
    pub source_credential: String,
    /// Sealed target credential.
    pub target_credential: String,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for migration records; the identifier is assigned by the
/// database sequence.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = migrations)]
pub struct NewMigrationRow {
    /// Source location string.
    pub source_location: String,
    /// Target location string.
    pub target_location: String,
    /// Lifecycle status.
    pub status: String,
    /// Percentage complete.
    pub progress: i16,
    /// Sealed source credential.
    pub source_credential: String,
    /// Sealed target credential.
    pub target_credential: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Mutable columns written by record updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = migrations)]
#[diesel(treat_none_as_null = true)]
pub struct MigrationChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Percentage complete.
    pub progress: i16,
    /// Failure description.
    pub error: Option<String>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

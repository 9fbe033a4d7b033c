//! Error types for migration domain validation and parsing.

use super::{MigrationId, MigrationStatus, Progress};
use thiserror::Error;

/// Errors returned while constructing or mutating migration domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrationDomainError {
    /// The source location does not follow `organization/project/repository`.
    #[error("invalid source location '{0}', expected organization/project/repository")]
    InvalidSourceLocation(String),

    /// The target location does not follow `user:<login>` or `org:<name>`.
    #[error("invalid target location '{0}', expected user:<login> or org:<name>")]
    InvalidTargetLocation(String),

    /// The progress value lies outside `[0, 100]`.
    #[error("progress {0} is out of range, expected 0..=100")]
    ProgressOutOfRange(u8),

    /// Normalising a repository name produced an empty string.
    #[error("repository name '{0}' has no characters usable on the target host")]
    EmptyRepositoryName(String),

    /// A sealed credential value is empty after trimming.
    #[error("sealed credential must not be empty")]
    EmptySealedCredential,

    /// A failure was recorded without a description.
    #[error("failure description must not be empty")]
    EmptyFailureReason,

    /// A URL could not carry embedded credentials.
    #[error("URL '{0}' cannot carry credentials")]
    UnauthenticatableUrl(String),

    /// The requested status transition is not permitted.
    #[error("invalid status transition for migration {migration_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Migration identifier.
        migration_id: MigrationId,
        /// Current status.
        from: MigrationStatus,
        /// Requested status.
        to: MigrationStatus,
    },

    /// Entering `failed` requires a failure description.
    #[error("migration {0} cannot fail without a failure description")]
    FailureRequiresReason(MigrationId),

    /// Progress may only move while the migration is running.
    #[error("migration {migration_id} is {status}; progress only moves while in_progress")]
    ProgressRequiresInProgress {
        /// Migration identifier.
        migration_id: MigrationId,
        /// Current status.
        status: MigrationStatus,
    },

    /// Progress never decreases.
    #[error("migration {migration_id} progress cannot move from {current} back to {requested}")]
    ProgressRegression {
        /// Migration identifier.
        migration_id: MigrationId,
        /// Committed progress.
        current: Progress,
        /// Rejected progress.
        requested: Progress,
    },
}

/// Error returned while parsing migration statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown migration status: {0}")]
pub struct ParseMigrationStatusError(pub String);

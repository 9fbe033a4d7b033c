//! Migration record aggregate and its lifecycle status.

use super::{
    MigrationCredentials, MigrationDomainError, MigrationId, ParseMigrationStatusError, Progress,
    SourceLocation, TargetLocation,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Migration lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// The record exists but the transfer has not started.
    Pending,
    /// The transfer engine is running.
    InProgress,
    /// All refs reached the target host.
    Completed,
    /// A stage failed; the record carries the failure description.
    Failed,
    /// The migration was cancelled before finishing.
    Cancelled,
}

impl MigrationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` when the state machine permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::InProgress | Self::Failed | Self::Cancelled
            ) | (
                Self::InProgress,
                Self::Completed | Self::Failed | Self::Cancelled
            )
        )
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MigrationStatus {
    type Error = ParseMigrationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseMigrationStatusError(value.to_owned())),
        }
    }
}

/// Validated input for creating a migration record.
///
/// The registry turns this into a [`MigrationRecord`] once it has assigned
/// the next identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMigration {
    source: SourceLocation,
    target: TargetLocation,
    credentials: MigrationCredentials,
    requested_at: DateTime<Utc>,
}

impl NewMigration {
    /// Captures a migration request at the current clock time.
    #[must_use]
    pub fn new(
        source: SourceLocation,
        target: TargetLocation,
        credentials: MigrationCredentials,
        clock: &impl Clock,
    ) -> Self {
        Self {
            source,
            target,
            credentials,
            requested_at: clock.utc(),
        }
    }

    /// Returns the source location.
    #[must_use]
    pub const fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Returns the target location.
    #[must_use]
    pub const fn target(&self) -> &TargetLocation {
        &self.target
    }

    /// Returns the sealed credentials.
    #[must_use]
    pub const fn credentials(&self) -> &MigrationCredentials {
        &self.credentials
    }

    /// Returns the request timestamp.
    #[must_use]
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}

/// One repository transfer attempt.
///
/// The serialised view never includes credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    id: MigrationId,
    source: SourceLocation,
    target: TargetLocation,
    status: MigrationStatus,
    progress: Progress,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    credentials: MigrationCredentials,
}

/// Parameter object for reconstructing a persisted migration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMigrationData {
    /// Persisted identifier.
    pub id: MigrationId,
    /// Persisted source location.
    pub source: SourceLocation,
    /// Persisted target location.
    pub target: TargetLocation,
    /// Persisted lifecycle status.
    pub status: MigrationStatus,
    /// Persisted progress.
    pub progress: Progress,
    /// Persisted failure description.
    pub error: Option<String>,
    /// Persisted start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted sealed credentials.
    pub credentials: MigrationCredentials,
}

impl MigrationRecord {
    /// Creates a `pending` record for a newly assigned identifier.
    #[must_use]
    pub fn create(id: MigrationId, new_migration: NewMigration) -> Self {
        let NewMigration {
            source,
            target,
            credentials,
            requested_at,
        } = new_migration;

        Self {
            id,
            source,
            target,
            status: MigrationStatus::Pending,
            progress: Progress::NONE,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: requested_at,
            updated_at: requested_at,
            credentials,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedMigrationData) -> Self {
        Self {
            id: data.id,
            source: data.source,
            target: data.target,
            status: data.status,
            progress: data.progress,
            error: data.error,
            started_at: data.started_at,
            completed_at: data.completed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
            credentials: data.credentials,
        }
    }

    /// Returns the migration identifier.
    #[must_use]
    pub const fn id(&self) -> MigrationId {
        self.id
    }

    /// Returns the source location.
    #[must_use]
    pub const fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Returns the target location.
    #[must_use]
    pub const fn target(&self) -> &TargetLocation {
        &self.target
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> MigrationStatus {
        self.status
    }

    /// Returns the committed progress.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Returns the failure description, present only when `failed`.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns when the transfer started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the transfer completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the sealed credentials.
    #[must_use]
    pub const fn credentials(&self) -> &MigrationCredentials {
        &self.credentials
    }

    /// Moves the record to `status`, stamping lifecycle timestamps.
    ///
    /// Entering `in_progress` stamps `started_at` if unset; entering
    /// `completed` stamps `completed_at` and forces progress to 100.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::FailureRequiresReason`] for `failed`
    /// (use [`Self::fail`]) and
    /// [`MigrationDomainError::InvalidStatusTransition`] when the state
    /// machine forbids the move.
    pub fn transition_to(
        &mut self,
        status: MigrationStatus,
        clock: &impl Clock,
    ) -> Result<(), MigrationDomainError> {
        if status == MigrationStatus::Failed {
            return Err(MigrationDomainError::FailureRequiresReason(self.id));
        }
        self.ensure_transition(status)?;

        let timestamp = clock.utc();
        match status {
            MigrationStatus::InProgress => {
                self.started_at.get_or_insert(timestamp);
            }
            MigrationStatus::Completed => {
                self.progress = Progress::COMPLETE;
                self.completed_at.get_or_insert(timestamp);
            }
            MigrationStatus::Pending | MigrationStatus::Failed | MigrationStatus::Cancelled => {}
        }
        self.status = status;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Records a new progress checkpoint.
    ///
    /// Re-committing the current value is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::ProgressRequiresInProgress`] unless
    /// the record is `in_progress`, and
    /// [`MigrationDomainError::ProgressRegression`] when `progress` is below
    /// the committed value.
    pub fn advance_progress(
        &mut self,
        progress: Progress,
        clock: &impl Clock,
    ) -> Result<(), MigrationDomainError> {
        if self.status != MigrationStatus::InProgress {
            return Err(MigrationDomainError::ProgressRequiresInProgress {
                migration_id: self.id,
                status: self.status,
            });
        }
        if progress < self.progress {
            return Err(MigrationDomainError::ProgressRegression {
                migration_id: self.id,
                current: self.progress,
                requested: progress,
            });
        }
        self.progress = progress;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Moves the record to `failed` with a description.
    ///
    /// Progress stays at the last committed checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::EmptyFailureReason`] for a blank
    /// description and [`MigrationDomainError::InvalidStatusTransition`] when
    /// the record is already terminal.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), MigrationDomainError> {
        let raw = reason.into();
        let description = raw.trim();
        if description.is_empty() {
            return Err(MigrationDomainError::EmptyFailureReason);
        }
        self.ensure_transition(MigrationStatus::Failed)?;

        self.status = MigrationStatus::Failed;
        self.error = Some(description.to_owned());
        self.updated_at = clock.utc();
        Ok(())
    }

    fn ensure_transition(&self, target: MigrationStatus) -> Result<(), MigrationDomainError> {
        if self.status.can_transition_to(target) {
            return Ok(());
        }
        Err(MigrationDomainError::InvalidStatusTransition {
            migration_id: self.id,
            from: self.status,
            to: target,
        })
    }
}

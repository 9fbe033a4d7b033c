//! Identifier and validated scalar types for the migration domain.

use super::MigrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-assigned identifier for a migration record.
///
/// Identifiers come from a monotonically increasing sequence and are never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(u64);

impl MigrationId {
    /// Creates a migration identifier from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer progress percentage in `[0, 100]`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Progress(u8);

impl Progress {
    /// Progress of a freshly created migration.
    pub const NONE: Self = Self(0);

    /// Progress of a completed migration.
    pub const COMPLETE: Self = Self(100);

    /// Creates a validated progress value.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::ProgressOutOfRange`] when the value
    /// exceeds 100.
    pub const fn new(value: u8) -> Result<Self, MigrationDomainError> {
        if value > 100 {
            return Err(MigrationDomainError::ProgressOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Progress {
    type Error = MigrationDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Fixed progress checkpoints committed by the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// The engine has started.
    Begun,
    /// The source repository was resolved and the target name derived.
    SourceResolved,
    /// The scratch workspace exists.
    WorkspaceReady,
    /// The mirror clone finished.
    MirrorCloned,
    /// The target repository exists.
    TargetReady,
    /// The mirror push finished.
    MirrorPushed,
}

impl Checkpoint {
    /// Returns the progress recorded at this checkpoint.
    #[must_use]
    pub const fn progress(self) -> Progress {
        match self {
            Self::Begun => Progress(10),
            Self::SourceResolved => Progress(20),
            Self::WorkspaceReady => Progress(40),
            Self::MirrorCloned => Progress(70),
            Self::TargetReady => Progress(80),
            Self::MirrorPushed => Progress(90),
        }
    }

    /// Returns a short label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begun => "begun",
            Self::SourceResolved => "source_resolved",
            Self::WorkspaceReady => "workspace_ready",
            Self::MirrorCloned => "mirror_cloned",
            Self::TargetReady => "target_ready",
            Self::MirrorPushed => "mirror_pushed",
        }
    }
}

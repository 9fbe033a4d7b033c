//! Mirror tool port: full-history clone and push.

use crate::migration::domain::AuthenticatedUrl;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Mirror operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOperation {
    /// `clone --mirror`.
    Clone,
    /// Re-pointing the mirror's remote.
    SetRemote,
    /// `push --mirror`.
    Push,
}

impl fmt::Display for MirrorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clone => "mirror clone",
            Self::SetRemote => "remote update",
            Self::Push => "mirror push",
        })
    }
}

/// Local version-control tool able to transfer every ref.
#[async_trait]
pub trait MirrorTool: Send + Sync {
    /// Clones every ref of `source` into a bare mirror at `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] when the tool cannot start, exits non-zero,
    /// or times out.
    async fn mirror_clone(&self, source: &AuthenticatedUrl, destination: &Path)
    -> MirrorResult<()>;

    /// Points the mirror at `target` and pushes every ref.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] when the tool cannot start, exits non-zero,
    /// or times out.
    async fn mirror_push(&self, mirror: &Path, target: &AuthenticatedUrl) -> MirrorResult<()>;
}

/// Errors returned by mirror tool adapters.
///
/// Messages never contain embedded credentials.
#[derive(Debug, Clone, Error)]
pub enum MirrorError {
    /// The tool process could not be started.
    #[error("{operation} could not start: {source}")]
    Spawn {
        /// Failed operation.
        operation: MirrorOperation,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The tool exited unsuccessfully.
    #[error("{operation} failed ({}): {stderr}", exit_label(.code))]
    Failed {
        /// Failed operation.
        operation: MirrorOperation,
        /// Exit code, absent when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error with secrets redacted.
        stderr: String,
    },

    /// The tool did not finish in time.
    #[error("{operation} timed out after {}s", .after.as_secs())]
    TimedOut {
        /// Failed operation.
        operation: MirrorOperation,
        /// Configured limit.
        after: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

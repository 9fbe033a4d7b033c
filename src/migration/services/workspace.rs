//! Scratch workspaces for in-flight transfers.

use crate::migration::domain::MigrationId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Directory name prefix used when none is configured.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "mirrorshift-";

const MIRROR_DIRECTORY: &str = "mirror.git";

/// Errors returned while preparing a workspace.
#[derive(Debug, Clone, Error)]
pub enum WorkspaceError {
    /// The scratch directory could not be created.
    #[error("could not create workspace under {}: {source}", .root.display())]
    Create {
        /// Configured workspace root.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The scratch directory could not be removed.
    #[error("could not remove workspace {}: {source}", .path.display())]
    Release {
        /// Workspace directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Hands out one uniquely named directory per transfer.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceManager {
    /// Creates a manager placing workspaces under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: DEFAULT_WORKSPACE_PREFIX.to_owned(),
        }
    }

    /// Creates a manager rooted in the system temporary directory.
    #[must_use]
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Overrides the directory name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates `<root>/<prefix><id>-<random>`.
    ///
    /// The random suffix keeps concurrent acquisitions for the same id
    /// apart.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Create`] when the root cannot be created or
    /// written to.
    pub fn acquire(&self, migration_id: MigrationId) -> Result<ScopedWorkspace, WorkspaceError> {
        let create_error = |err: std::io::Error| WorkspaceError::Create {
            root: self.root.clone(),
            source: Arc::new(err),
        };
        std::fs::create_dir_all(&self.root).map_err(create_error)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{migration_id}-", self.prefix))
            .tempdir_in(&self.root)
            .map_err(create_error)?;

        debug!(%migration_id, path = %dir.path().display(), "workspace acquired");
        Ok(ScopedWorkspace {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }
}

/// Workspace directory removed when released or dropped.
#[derive(Debug)]
pub struct ScopedWorkspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScopedWorkspace {
    /// Returns the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns where the bare mirror is cloned.
    #[must_use]
    pub fn mirror_path(&self) -> PathBuf {
        self.path.join(MIRROR_DIRECTORY)
    }

    /// Removes the workspace now.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Release`] when the tree cannot be removed.
    pub fn release(mut self) -> Result<(), WorkspaceError> {
        self.remove()
    }

    fn remove(&mut self) -> Result<(), WorkspaceError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        dir.close().map_err(|err| WorkspaceError::Release {
            path: self.path.clone(),
            source: Arc::new(err),
        })?;
        debug!(path = %self.path.display(), "workspace released");
        Ok(())
    }
}

impl Drop for ScopedWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            warn!(error = %err, "workspace cleanup failed");
        }
    }
}

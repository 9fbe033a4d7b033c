//! In-memory mirror tool that records transfers instead of running git.

use crate::migration::{
    domain::AuthenticatedUrl,
    ports::{MirrorError, MirrorOperation, MirrorResult, MirrorTool},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// One transfer observed by [`InMemoryMirrorTool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTransfer {
    /// Local mirror path.
    pub mirror: PathBuf,
    /// Remote address with credentials stripped.
    pub remote: String,
}

/// Mirror tool double that creates the mirror directory and records calls.
///
/// An optional delay makes each operation suspend, which lets tests observe
/// records while a transfer is running.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMirrorTool {
    state: Arc<RwLock<InMemoryMirrorState>>,
}

#[derive(Debug, Default)]
struct InMemoryMirrorState {
    clones: Vec<MirrorTransfer>,
    pushes: Vec<MirrorTransfer>,
    clone_failure: Option<String>,
    push_failure: Option<String>,
    delay: Option<Duration>,
}

impl InMemoryMirrorTool {
    /// Creates a mirror tool that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends every operation for `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.update(|state| state.delay = Some(delay));
        self
    }

    /// Makes clones exit non-zero with `stderr`.
    #[must_use]
    pub fn failing_clone(self, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        self.update(|state| state.clone_failure = Some(stderr));
        self
    }

    /// Makes pushes exit non-zero with `stderr`.
    #[must_use]
    pub fn failing_push(self, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        self.update(|state| state.push_failure = Some(stderr));
        self
    }

    /// Returns every clone performed so far.
    #[must_use]
    pub fn clones(&self) -> Vec<MirrorTransfer> {
        self.read(|state| state.clones.clone())
    }

    /// Returns every push performed so far.
    #[must_use]
    pub fn pushes(&self) -> Vec<MirrorTransfer> {
        self.read(|state| state.pushes.clone())
    }

    fn update(&self, apply: impl FnOnce(&mut InMemoryMirrorState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        apply(&mut state);
    }

    fn read<T>(&self, view: impl FnOnce(&InMemoryMirrorState) -> T) -> T {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        view(&state)
    }

    async fn pause(&self) {
        if let Some(delay) = self.read(|state| state.delay) {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected_failure(
    operation: MirrorOperation,
    remote: &AuthenticatedUrl,
    stderr: &str,
) -> MirrorError {
    MirrorError::Failed {
        operation,
        code: Some(128),
        stderr: remote.redact(stderr),
    }
}

#[async_trait]
impl MirrorTool for InMemoryMirrorTool {
    async fn mirror_clone(
        &self,
        source: &AuthenticatedUrl,
        destination: &Path,
    ) -> MirrorResult<()> {
        self.pause().await;
        if let Some(stderr) = self.read(|state| state.clone_failure.clone()) {
            return Err(injected_failure(MirrorOperation::Clone, source, &stderr));
        }

        std::fs::create_dir_all(destination).map_err(|err| MirrorError::Spawn {
            operation: MirrorOperation::Clone,
            source: Arc::new(err),
        })?;
        let transfer = MirrorTransfer {
            mirror: destination.to_path_buf(),
            remote: source.redacted().to_owned(),
        };
        self.update(|state| state.clones.push(transfer));
        Ok(())
    }

    async fn mirror_push(&self, mirror: &Path, target: &AuthenticatedUrl) -> MirrorResult<()> {
        self.pause().await;
        if let Some(stderr) = self.read(|state| state.push_failure.clone()) {
            return Err(injected_failure(MirrorOperation::Push, target, &stderr));
        }

        let transfer = MirrorTransfer {
            mirror: mirror.to_path_buf(),
            remote: target.redacted().to_owned(),
        };
        self.update(|state| state.pushes.push(transfer));
        Ok(())
    }
}

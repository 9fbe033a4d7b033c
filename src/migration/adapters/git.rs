//! Mirror tool backed by the `git` command-line client.

use crate::migration::{
    domain::AuthenticatedUrl,
    ports::{MirrorError, MirrorOperation, MirrorResult, MirrorTool},
};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs `git clone --mirror` and `git push --mirror` as child processes.
///
/// Children are killed when the owning future is dropped, which is how the
/// optional timeout is enforced. Interactive prompts are disabled so a
/// rejected credential fails instead of hanging.
#[derive(Debug, Clone)]
pub struct GitMirrorTool {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for GitMirrorTool {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitMirrorTool {
    /// Creates a tool invoking `program` without a time limit.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bounds every git invocation by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run<I, S>(
        &self,
        operation: MirrorOperation,
        args: I,
        remote: &AuthenticatedUrl,
    ) -> MirrorResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(%operation, remote = remote.redacted(), "running git");
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| MirrorError::TimedOut {
                    operation,
                    after: limit,
                })?,
            None => command.output().await,
        }
        .map_err(|err| MirrorError::Spawn {
            operation,
            source: Arc::new(err),
        })?;

        check_status(operation, &output, remote)
    }
}

fn check_status(
    operation: MirrorOperation,
    output: &Output,
    remote: &AuthenticatedUrl,
) -> MirrorResult<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(MirrorError::Failed {
        operation,
        code: output.status.code(),
        stderr: remote.redact(stderr.trim()),
    })
}

#[async_trait]
impl MirrorTool for GitMirrorTool {
    async fn mirror_clone(
        &self,
        source: &AuthenticatedUrl,
        destination: &Path,
    ) -> MirrorResult<()> {
        let args: [&OsStr; 5] = [
            OsStr::new("clone"),
            OsStr::new("--mirror"),
            OsStr::new("--quiet"),
            OsStr::new(source.expose()),
            destination.as_os_str(),
        ];
        self.run(MirrorOperation::Clone, args, source).await
    }

    async fn mirror_push(&self, mirror: &Path, target: &AuthenticatedUrl) -> MirrorResult<()> {
        let set_remote: [&OsStr; 6] = [
            OsStr::new("-C"),
            mirror.as_os_str(),
            OsStr::new("remote"),
            OsStr::new("set-url"),
            OsStr::new("origin"),
            OsStr::new(target.expose()),
        ];
        self.run(MirrorOperation::SetRemote, set_remote, target)
            .await?;

        let push: [&OsStr; 6] = [
            OsStr::new("-C"),
            mirror.as_os_str(),
            OsStr::new("push"),
            OsStr::new("--mirror"),
            OsStr::new("--quiet"),
            OsStr::new("origin"),
        ];
        self.run(MirrorOperation::Push, push, target).await
    }
}

//! Transfer engine: clone, ensure the target, push.
//!
//! The engine runs one migration from `pending` to a terminal state. It
//! never raises past [`TransferEngine::run`]: every stage failure is
//! described and committed through the [`StatusTracker`].

use super::{
    tracker::{StatusTracker, TrackerError},
    workspace::{ScopedWorkspace, WorkspaceError, WorkspaceManager},
};
use crate::migration::{
    domain::{
        Checkpoint, MigrationDomainError, MigrationId, MigrationRecord, MigrationStatus,
        SealedCredential, TargetRepositoryName,
    },
    ports::{
        CredentialError, CredentialUnwrapper, MigrationRegistry, MirrorError, MirrorTool,
        RepositoryCreation, SourceHost, SourceHostError, TargetHost, TargetHostError,
    },
};
use mockable::Clock;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Which side of the transfer a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSide {
    /// Source-host credential.
    Source,
    /// Target-host credential.
    Target,
}

impl fmt::Display for CredentialSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Stage failures inside the engine.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The record was not `pending` when the engine started.
    #[error("migration {migration_id} is {status}; only pending migrations can run")]
    NotPending {
        /// Migration identifier.
        migration_id: MigrationId,
        /// Status found.
        status: MigrationStatus,
    },

    /// The record reached a terminal state from outside while running.
    #[error("migration {migration_id} was stopped externally ({status})")]
    Stopped {
        /// Migration identifier.
        migration_id: MigrationId,
        /// Terminal status found.
        status: MigrationStatus,
    },

    /// A credential could not be unsealed.
    #[error("could not unwrap {side} credential: {source}")]
    Credential {
        /// Credential owner.
        side: CredentialSide,
        /// Unwrapping failure.
        #[source]
        source: CredentialError,
    },

    /// The source host failed.
    #[error(transparent)]
    Source(#[from] SourceHostError),

    /// The target host failed.
    #[error(transparent)]
    Target(#[from] TargetHostError),

    /// The workspace could not be prepared.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Clone or push failed.
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// A value failed validation.
    #[error(transparent)]
    Domain(#[from] MigrationDomainError),

    /// The tracker rejected a change.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Collaborators the engine drives.
#[derive(Clone)]
pub struct TransferPorts {
    /// Unseals the stored credentials.
    pub credentials: Arc<dyn CredentialUnwrapper>,
    /// Source host client.
    pub source: Arc<dyn SourceHost>,
    /// Target host client.
    pub target: Arc<dyn TargetHost>,
    /// Mirror clone and push tool.
    pub mirror: Arc<dyn MirrorTool>,
}

struct Secrets {
    source: SecretString,
    target: SecretString,
}

/// Executes migrations one id at a time.
pub struct TransferEngine<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    tracker: StatusTracker<R, C>,
    ports: TransferPorts,
    workspaces: Arc<WorkspaceManager>,
}

impl<R, C> Clone for TransferEngine<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            ports: self.ports.clone(),
            workspaces: Arc::clone(&self.workspaces),
        }
    }
}

impl<R, C> TransferEngine<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    /// Creates an engine writing through `tracker`.
    #[must_use]
    pub const fn new(
        tracker: StatusTracker<R, C>,
        ports: TransferPorts,
        workspaces: Arc<WorkspaceManager>,
    ) -> Self {
        Self {
            tracker,
            ports,
            workspaces,
        }
    }

    /// Runs migration `id` to a terminal state.
    ///
    /// Failures are committed as `failed` with a description; a record
    /// that is not `pending` is left untouched.
    pub async fn run(&self, id: MigrationId) {
        match self.execute(id).await {
            Ok(()) => info!(migration_id = %id, "migration completed"),
            Err(err @ TransferError::NotPending { .. }) => {
                warn!(migration_id = %id, error = %err, "migration not started");
            }
            Err(TransferError::Stopped { status, .. }) => {
                info!(migration_id = %id, %status, "transfer stopped");
            }
            Err(err) => {
                warn!(migration_id = %id, error = %err, "migration failed");
                if let Err(record_err) = self.tracker.set_error(id, err.to_string()).await {
                    warn!(
                        migration_id = %id,
                        error = %record_err,
                        "could not record migration failure"
                    );
                }
            }
        }
    }

    async fn execute(&self, id: MigrationId) -> Result<(), TransferError> {
        let record = self.tracker.get(id).await?;
        if record.status() != MigrationStatus::Pending {
            return Err(TransferError::NotPending {
                migration_id: id,
                status: record.status(),
            });
        }

        self.tracker
            .set_status(id, MigrationStatus::InProgress)
            .await
            .map_err(|err| claim_rejected(id, err))?;
        self.checkpoint(id, Checkpoint::Begun).await?;

        let secrets = self.unwrap_secrets(&record)?;
        let repository = self
            .ports
            .source
            .fetch_repository(&secrets.source, record.source())
            .await?;
        let name = TargetRepositoryName::derive(&repository.name)?;
        info!(
            migration_id = %id,
            source = %record.source(),
            target_name = %name,
            "source repository resolved"
        );
        self.checkpoint(id, Checkpoint::SourceResolved).await?;

        let workspace = self.workspaces.acquire(id)?;
        self.checkpoint(id, Checkpoint::WorkspaceReady).await?;

        let clone_url = self
            .ports
            .source
            .clone_url(&repository, &secrets.source)?;
        self.ports
            .mirror
            .mirror_clone(&clone_url, &workspace.mirror_path())
            .await?;
        self.checkpoint(id, Checkpoint::MirrorCloned).await?;

        self.ensure_target(&record, &name, &secrets.target).await?;
        self.checkpoint(id, Checkpoint::TargetReady).await?;

        let push_url = self
            .ports
            .target
            .push_url(record.target(), &name, &secrets.target)?;
        self.ports
            .mirror
            .mirror_push(&workspace.mirror_path(), &push_url)
            .await?;
        self.checkpoint(id, Checkpoint::MirrorPushed).await?;

        release(id, workspace);
        self.tracker
            .set_status(id, MigrationStatus::Completed)
            .await
            .map_err(|err| stopped_or(id, err))?;
        Ok(())
    }

    fn unwrap_secrets(&self, record: &MigrationRecord) -> Result<Secrets, TransferError> {
        let credentials = record.credentials();
        Ok(Secrets {
            source: self.unseal(CredentialSide::Source, credentials.source())?,
            target: self.unseal(CredentialSide::Target, credentials.target())?,
        })
    }

    fn unseal(
        &self,
        side: CredentialSide,
        sealed: &SealedCredential,
    ) -> Result<SecretString, TransferError> {
        self.ports
            .credentials
            .unwrap_credential(sealed)
            .map_err(|source| TransferError::Credential { side, source })
    }

    async fn ensure_target(
        &self,
        record: &MigrationRecord,
        name: &TargetRepositoryName,
        secret: &SecretString,
    ) -> Result<(), TransferError> {
        let outcome = self
            .ports
            .target
            .ensure_repository(secret, record.target(), name)
            .await?;
        match outcome {
            RepositoryCreation::Created { full_name } => {
                info!(
                    migration_id = %record.id(),
                    repository = %full_name,
                    "target repository created"
                );
            }
            RepositoryCreation::AlreadyExists => {
                info!(
                    migration_id = %record.id(),
                    owner = record.target().owner(),
                    repository = %name,
                    "target repository already exists, pushing into it"
                );
            }
        }
        Ok(())
    }

    async fn checkpoint(
        &self,
        id: MigrationId,
        checkpoint: Checkpoint,
    ) -> Result<(), TransferError> {
        self.tracker
            .set_progress(id, checkpoint.progress())
            .await
            .map_err(|err| stopped_or(id, err))?;
        info!(migration_id = %id, checkpoint = checkpoint.as_str(), "checkpoint reached");
        Ok(())
    }
}

/// Another run started `id` between the pending check and the claim.
fn claim_rejected(id: MigrationId, err: TrackerError) -> TransferError {
    let already_running = matches!(
        err,
        TrackerError::Domain(MigrationDomainError::InvalidStatusTransition {
            from: MigrationStatus::InProgress,
            to: MigrationStatus::InProgress,
            ..
        })
    );
    if already_running {
        return TransferError::NotPending {
            migration_id: id,
            status: MigrationStatus::InProgress,
        };
    }
    stopped_or(id, err)
}

fn stopped_or(id: MigrationId, err: TrackerError) -> TransferError {
    let found = match &err {
        TrackerError::Domain(
            MigrationDomainError::ProgressRequiresInProgress { status, .. }
            | MigrationDomainError::InvalidStatusTransition { from: status, .. },
        ) => Some(*status),
        _ => None,
    };
    match found {
        Some(status) if status.is_terminal() => TransferError::Stopped {
            migration_id: id,
            status,
        },
        _ => TransferError::Tracker(err),
    }
}

fn release(id: MigrationId, workspace: ScopedWorkspace) {
    if let Err(err) = workspace.release() {
        warn!(migration_id = %id, error = %err, "workspace cleanup failed");
    }
}

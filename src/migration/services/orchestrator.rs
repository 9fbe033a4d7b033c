//! Migration intake, lookup and administrative updates.

use super::{
    engine::{TransferEngine, TransferPorts},
    tracker::{StatusTracker, TrackerError},
    workspace::WorkspaceManager,
};
use crate::migration::{
    domain::{
        MigrationCredentials, MigrationDomainError, MigrationId, MigrationRecord, NewMigration,
        Progress, SealedCredential, SourceLocation, TargetLocation,
    },
    ports::{
        CredentialError, MigrationRegistry, RegistryError, SourceHostError, SourceRepository,
        TargetHostError, TargetRepositorySummary,
    },
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

/// Request payload for starting a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMigrationRequest {
    source: String,
    target: String,
    source_credential: SealedCredential,
    target_credential: SealedCredential,
}

impl CreateMigrationRequest {
    /// Creates a request from raw locations and sealed credentials.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        source_credential: SealedCredential,
        target_credential: SealedCredential,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_credential,
            target_credential,
        }
    }
}

/// Service-level errors for migration operations.
#[derive(Debug, Error)]
pub enum MigrationServiceError {
    /// No record exists for the identifier.
    #[error("migration {0} not found")]
    NotFound(MigrationId),

    /// Request validation failed.
    #[error(transparent)]
    Domain(#[from] MigrationDomainError),

    /// Registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Tracker rejected the update.
    #[error(transparent)]
    Tracker(TrackerError),

    /// A credential could not be unsealed for a browsing call.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The source host failed a browsing call.
    #[error(transparent)]
    Source(#[from] SourceHostError),

    /// The target host failed a browsing call.
    #[error(transparent)]
    Target(#[from] TargetHostError),
}

impl From<TrackerError> for MigrationServiceError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(id) => Self::NotFound(id),
            TrackerError::Domain(domain) => Self::Domain(domain),
            TrackerError::Registry(_) => Self::Tracker(err),
        }
    }
}

/// Result type for migration service operations.
pub type MigrationServiceResult<T> = Result<T, MigrationServiceError>;

/// A freshly created migration and the task running it.
#[derive(Debug)]
pub struct SubmittedMigration {
    record: MigrationRecord,
    handle: JoinHandle<()>,
}

impl SubmittedMigration {
    /// Returns the record as created, in `pending`.
    #[must_use]
    pub const fn record(&self) -> &MigrationRecord {
        &self.record
    }

    /// Returns the migration identifier.
    #[must_use]
    pub const fn id(&self) -> MigrationId {
        self.record.id()
    }

    /// Splits into the created record and the transfer task handle.
    #[must_use]
    pub fn into_parts(self) -> (MigrationRecord, JoinHandle<()>) {
        (self.record, self.handle)
    }
}

/// Migration orchestration service.
pub struct MigrationService<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    clock: Arc<C>,
    tracker: StatusTracker<R, C>,
    engine: TransferEngine<R, C>,
    ports: TransferPorts,
}

impl<R, C> Clone for MigrationService<R, C>
where
    R: MigrationRegistry,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            tracker: self.tracker.clone(),
            engine: self.engine.clone(),
            ports: self.ports.clone(),
        }
    }
}

impl<R, C> MigrationService<R, C>
where
    R: MigrationRegistry + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new migration service.
    #[must_use]
    pub fn new(
        registry: Arc<R>,
        clock: Arc<C>,
        ports: TransferPorts,
        workspaces: WorkspaceManager,
    ) -> Self {
        let tracker = StatusTracker::new(Arc::clone(&registry), Arc::clone(&clock));
        let engine = TransferEngine::new(tracker.clone(), ports.clone(), Arc::new(workspaces));
        Self {
            registry,
            clock,
            tracker,
            engine,
            ports,
        }
    }

    /// Creates a `pending` migration and starts its transfer.
    ///
    /// Returns as soon as the record exists; the transfer runs on its own
    /// task and reports through the record.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Domain`] for malformed locations and
    /// [`MigrationServiceError::Registry`] when the record cannot be stored.
    pub async fn submit(
        &self,
        request: CreateMigrationRequest,
    ) -> MigrationServiceResult<SubmittedMigration> {
        let source = SourceLocation::parse(request.source)?;
        let target = TargetLocation::parse(request.target)?;
        let credentials =
            MigrationCredentials::new(request.source_credential, request.target_credential);
        let new_migration = NewMigration::new(source, target, credentials, &*self.clock);

        let record = self.registry.create(new_migration).await?;
        let id = record.id();
        info!(
            migration_id = %id,
            source = %record.source(),
            target = %record.target(),
            "migration submitted"
        );

        let engine = self.engine.clone();
        let handle = tokio::spawn(async move { engine.run(id).await });
        Ok(SubmittedMigration { record, handle })
    }

    /// Returns the committed record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::NotFound`] for unknown ids.
    pub async fn get(&self, id: MigrationId) -> MigrationServiceResult<MigrationRecord> {
        Ok(self.tracker.get(id).await?)
    }

    /// Lists every migration in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Registry`] when the lookup fails.
    pub async fn list(&self) -> MigrationServiceResult<Vec<MigrationRecord>> {
        Ok(self.registry.list().await?)
    }

    /// Sets progress on a running migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Domain`] for out-of-range values,
    /// regressions or a migration that is not running.
    pub async fn set_progress(
        &self,
        id: MigrationId,
        value: u8,
    ) -> MigrationServiceResult<MigrationRecord> {
        let progress = Progress::new(value)?;
        Ok(self.tracker.set_progress(id, progress).await?)
    }

    /// Marks a migration `failed` with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Domain`] for blank messages or
    /// terminal migrations.
    pub async fn set_error(
        &self,
        id: MigrationId,
        message: impl Into<String> + Send,
    ) -> MigrationServiceResult<MigrationRecord> {
        Ok(self.tracker.set_error(id, message).await?)
    }

    /// Cancels a pending or running migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Domain`] when the migration already
    /// reached a terminal state.
    pub async fn cancel(&self, id: MigrationId) -> MigrationServiceResult<MigrationRecord> {
        Ok(self.tracker.cancel(id).await?)
    }

    /// Lists repositories in a source project.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Credential`] when the credential
    /// cannot be unsealed and [`MigrationServiceError::Source`] on host
    /// failures.
    pub async fn list_source_repositories(
        &self,
        credential: &SealedCredential,
        organization: &str,
        project: &str,
    ) -> MigrationServiceResult<Vec<SourceRepository>> {
        let secret = self.ports.credentials.unwrap_credential(credential)?;
        Ok(self
            .ports
            .source
            .list_repositories(&secret, organization, project)
            .await?)
    }

    /// Lists organisations the target credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Credential`] when the credential
    /// cannot be unsealed and [`MigrationServiceError::Target`] on host
    /// failures.
    pub async fn list_target_organizations(
        &self,
        credential: &SealedCredential,
    ) -> MigrationServiceResult<Vec<String>> {
        let secret = self.ports.credentials.unwrap_credential(credential)?;
        Ok(self.ports.target.list_organizations(&secret).await?)
    }

    /// Lists repositories in a target namespace.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationServiceError::Domain`] for a malformed location,
    /// [`MigrationServiceError::Credential`] when the credential cannot be
    /// unsealed and [`MigrationServiceError::Target`] on host failures.
    pub async fn list_target_repositories(
        &self,
        credential: &SealedCredential,
        target: &str,
    ) -> MigrationServiceResult<Vec<TargetRepositorySummary>> {
        let location = TargetLocation::parse(target)?;
        let secret = self.ports.credentials.unwrap_credential(credential)?;
        Ok(self
            .ports
            .target
            .list_repositories(&secret, &location)
            .await?)
    }
}

//! Shared world state for migration lifecycle BDD scenarios.

use std::sync::Arc;

use mirrorshift::migration::{
    adapters::{
        credentials::{CredentialSealer, SealedBoxUnwrapper, generate_secret_key},
        memory::{
            InMemoryMigrationRegistry, InMemoryMirrorTool, InMemorySourceHost, InMemoryTargetHost,
        },
    },
    domain::MigrationRecord,
    services::{
        CreateMigrationRequest, MigrationService, MigrationServiceResult, TransferPorts,
        WorkspaceManager,
    },
};
use mockable::DefaultClock;
use rstest::fixture;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

/// Service type used by the BDD world.
pub type TestMigrationService = MigrationService<InMemoryMigrationRegistry, DefaultClock>;

/// Scenario world for migration lifecycle behaviour tests.
pub struct MigrationWorld {
    pub service: TestMigrationService,
    pub source: InMemorySourceHost,
    pub target: InMemoryTargetHost,
    pub sealer: CredentialSealer,
    pub last_record: Option<MigrationRecord>,
    pub last_submission: Option<MigrationServiceResult<MigrationRecord>>,
    pub last_cancellation: Option<MigrationServiceResult<MigrationRecord>>,
    _workspace_root: TempDir,
}

impl MigrationWorld {
    /// Creates a world with empty hosts and a fresh key pair.
    ///
    /// # Panics
    ///
    /// Panics when the scratch directory or key pair cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let unwrapper = SealedBoxUnwrapper::new(generate_secret_key());
        let sealer = unwrapper.sealer().expect("key is configured");
        let source = InMemorySourceHost::new();
        let target = InMemoryTargetHost::new(Url::parse("https://github.com/").expect("valid URL"));
        let root = TempDir::new().expect("workspace root");
        let ports = TransferPorts {
            credentials: Arc::new(unwrapper),
            source: Arc::new(source.clone()),
            target: Arc::new(target.clone()),
            mirror: Arc::new(InMemoryMirrorTool::new()),
        };
        let service = MigrationService::new(
            Arc::new(InMemoryMigrationRegistry::new()),
            Arc::new(DefaultClock),
            ports,
            WorkspaceManager::new(root.path()),
        );

        Self {
            service,
            source,
            target,
            sealer,
            last_record: None,
            last_submission: None,
            last_cancellation: None,
            _workspace_root: root,
        }
    }

    /// Builds a request with freshly sealed tokens.
    ///
    /// # Errors
    ///
    /// Returns an error when sealing fails.
    pub fn request(
        &self,
        source: String,
        target: String,
    ) -> Result<CreateMigrationRequest, eyre::Report> {
        let source_credential = self.sealer.seal(&SecretString::from("azdo-bdd-pat"))?;
        let target_credential = self.sealer.seal(&SecretString::from("ghp_bdd"))?;
        Ok(CreateMigrationRequest::new(
            source,
            target,
            source_credential,
            target_credential,
        ))
    }
}

impl Default for MigrationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> MigrationWorld {
    MigrationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

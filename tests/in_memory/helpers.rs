//! Shared test helpers for in-memory migration integration tests.

use std::sync::Arc;

use mirrorshift::migration::{
    adapters::{
        credentials::{CredentialSealer, SealedBoxUnwrapper, generate_secret_key},
        memory::{
            InMemoryMigrationRegistry, InMemoryMirrorTool, InMemorySourceHost, InMemoryTargetHost,
        },
    },
    domain::{MigrationRecord, SealedCredential},
    ports::SourceRepository,
    services::{CreateMigrationRequest, MigrationService, TransferPorts, WorkspaceManager},
};
use mockable::DefaultClock;
use rstest::fixture;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

/// Personal access token accepted by the source host.
pub const SOURCE_PAT: &str = "azdo-integration-pat";

/// Token used for the target host.
pub const TARGET_PAT: &str = "ghp_integration";

/// Service type used by the integration tests.
pub type TestService = MigrationService<InMemoryMigrationRegistry, DefaultClock>;

/// Service wired to in-memory hosts with handles for inspection.
pub struct MigrationHarness {
    pub service: TestService,
    pub source: InMemorySourceHost,
    pub target: InMemoryTargetHost,
    pub mirror: InMemoryMirrorTool,
    pub sealer: CredentialSealer,
    pub root: TempDir,
}

impl MigrationHarness {
    /// Builds a harness whose unwrapper opens credentials from `sealer`.
    pub fn build(
        mirror: InMemoryMirrorTool,
        unwrapper: SealedBoxUnwrapper,
        sealer: CredentialSealer,
    ) -> Self {
        let source = InMemorySourceHost::new();
        source
            .require_token(SOURCE_PAT)
            .expect("source accepts token");
        let target = InMemoryTargetHost::new(Url::parse("https://github.com/").expect("valid URL"));
        let root = TempDir::new().expect("workspace root");
        let ports = TransferPorts {
            credentials: Arc::new(unwrapper),
            source: Arc::new(source.clone()),
            target: Arc::new(target.clone()),
            mirror: Arc::new(mirror.clone()),
        };
        let service = MigrationService::new(
            Arc::new(InMemoryMigrationRegistry::new()),
            Arc::new(DefaultClock),
            ports,
            WorkspaceManager::new(root.path()).with_prefix("it-"),
        );
        Self {
            service,
            source,
            target,
            mirror,
            sealer,
            root,
        }
    }

    /// Builds a harness with a fresh key pair.
    pub fn with_mirror(mirror: InMemoryMirrorTool) -> Self {
        let unwrapper = SealedBoxUnwrapper::new(generate_secret_key());
        let sealer = unwrapper.sealer().expect("key is configured");
        Self::build(mirror, unwrapper, sealer)
    }

    /// Registers `names` under `contoso/platform`.
    pub fn with_source_repositories(self, names: &[&str]) -> Self {
        for name in names {
            self.source
                .add_repository("contoso", "platform", source_repository(name))
                .expect("source accepts repository");
        }
        self
    }

    /// Seals `secret` for this harness.
    pub fn seal(&self, secret: &str) -> SealedCredential {
        self.sealer
            .seal(&SecretString::from(secret))
            .expect("sealing succeeds")
    }

    /// Builds a request carrying both sealed tokens.
    pub fn request(&self, source: &str, target: &str) -> CreateMigrationRequest {
        CreateMigrationRequest::new(source, target, self.seal(SOURCE_PAT), self.seal(TARGET_PAT))
    }

    /// Submits a migration and waits for its transfer task.
    pub async fn migrate(&self, source: &str, target: &str) -> MigrationRecord {
        let submitted = self
            .service
            .submit(self.request(source, target))
            .await
            .expect("submission succeeds");
        let (record, handle) = submitted.into_parts();
        handle.await.expect("transfer task completes");
        self.service.get(record.id()).await.expect("record exists")
    }

    /// Counts directories left under the workspace root.
    pub fn workspace_entries(&self) -> usize {
        std::fs::read_dir(self.root.path())
            .expect("root is readable")
            .count()
    }
}

/// Repository metadata as the source host reports it.
pub fn source_repository(name: &str) -> SourceRepository {
    SourceRepository {
        id: format!("{}-id", name.to_ascii_lowercase().replace(' ', "-")),
        name: name.to_owned(),
        remote_url: Url::parse("https://dev.azure.com/contoso/platform/_git/")
            .and_then(|base| base.join(name))
            .expect("valid URL"),
        default_branch: Some("refs/heads/main".to_owned()),
    }
}

/// Provides a harness with three source repositories.
#[fixture]
pub fn harness() -> MigrationHarness {
    MigrationHarness::with_mirror(InMemoryMirrorTool::new()).with_source_repositories(&[
        "Billing",
        "Ledger Service",
        "payments.api",
    ])
}

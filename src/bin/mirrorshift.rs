//! Runs one repository migration to completion.
//!
//! Usage:
//!
//! ```text
//! mirrorshift <organization/project/repository> <user:login|org:name>
//! ```
//!
//! Sealed credentials are read from `MIRRORSHIFT_SOURCE_CREDENTIAL` and
//! `MIRRORSHIFT_TARGET_CREDENTIAL`; settings load as described in
//! [`mirrorshift::config`]. The process exits non-zero unless the migration
//! completes.

use mirrorshift::config::{Settings, SettingsError};
use mirrorshift::migration::{
    adapters::{
        azure_devops::AzureDevOpsClient, github::GitHubClient, memory::InMemoryMigrationRegistry,
        postgres::PostgresMigrationRegistry,
    },
    domain::{MigrationId, MigrationStatus, SealedCredential},
    ports::{MigrationRegistry, SourceHostError, TargetHostError},
    services::{
        CreateMigrationRequest, MigrationService, MigrationServiceError, TransferPorts,
        WorkspaceManager,
    },
};
use mirrorshift::telemetry::{self, TelemetryError};
use mockable::DefaultClock;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::info;

const SOURCE_CREDENTIAL_VAR: &str = "MIRRORSHIFT_SOURCE_CREDENTIAL";
const TARGET_CREDENTIAL_VAR: &str = "MIRRORSHIFT_TARGET_CREDENTIAL";
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the command.
#[derive(Debug, Error)]
enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceHostError),

    #[error(transparent)]
    Target(#[from] TargetHostError),

    #[error(transparent)]
    Service(#[from] MigrationServiceError),

    #[error("migration {id} ended {status}{}", failure_suffix(.error))]
    Unsuccessful {
        id: MigrationId,
        status: MigrationStatus,
        error: Option<String>,
    },
}

fn failure_suffix(error: &Option<String>) -> String {
    error
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

struct Invocation {
    source: String,
    target: String,
}

fn main() -> Result<(), BoxError> {
    let invocation = parse_args(env::args().skip(1))?;
    let settings = Settings::load().map_err(CliError::from)?;
    telemetry::init(&settings.log).map_err(CliError::from)?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(run(invocation, settings))?;
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Invocation, CliError> {
    let usage = || {
        CliError::InvalidArgs(
            "usage: mirrorshift <organization/project/repository> <user:login|org:name>".to_owned(),
        )
    };
    let source = args.next().ok_or_else(usage)?;
    let target = args.next().ok_or_else(usage)?;
    if args.next().is_some() {
        return Err(usage());
    }
    Ok(Invocation { source, target })
}

fn sealed_from_env(var: &'static str) -> Result<SealedCredential, CliError> {
    let raw = env::var(var).map_err(|_| CliError::MissingCredential(var))?;
    SealedCredential::new(raw).map_err(|_| CliError::MissingCredential(var))
}

async fn run(invocation: Invocation, settings: Settings) -> Result<(), CliError> {
    let ports = TransferPorts {
        credentials: Arc::new(settings.credentials.unwrapper()?),
        source: Arc::new(AzureDevOpsClient::new(settings.source.client_config()?)?),
        target: Arc::new(GitHubClient::new(settings.target.client_config()?)?),
        mirror: Arc::new(settings.git.mirror_tool()),
    };
    let request = CreateMigrationRequest::new(
        invocation.source,
        invocation.target,
        sealed_from_env(SOURCE_CREDENTIAL_VAR)?,
        sealed_from_env(TARGET_CREDENTIAL_VAR)?,
    );
    let workspaces = settings.workspace.manager();

    match settings.registry.pool()? {
        Some(pool) => {
            let registry = Arc::new(PostgresMigrationRegistry::new(pool));
            migrate(registry, ports, workspaces, request).await
        }
        None => {
            let registry = Arc::new(InMemoryMigrationRegistry::new());
            migrate(registry, ports, workspaces, request).await
        }
    }
}

async fn migrate<R>(
    registry: Arc<R>,
    ports: TransferPorts,
    workspaces: WorkspaceManager,
    request: CreateMigrationRequest,
) -> Result<(), CliError>
where
    R: MigrationRegistry + 'static,
{
    let service = MigrationService::new(registry, Arc::new(DefaultClock), ports, workspaces);
    let submitted = service.submit(request).await?;
    let id = submitted.id();

    let record = loop {
        let current = service.get(id).await?;
        info!(
            migration_id = %id,
            status = %current.status(),
            progress = current.progress().value(),
            "migration status"
        );
        if current.status().is_terminal() {
            break current;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    if record.status() == MigrationStatus::Completed {
        return Ok(());
    }
    Err(CliError::Unsuccessful {
        id,
        status: record.status(),
        error: record.error().map(ToOwned::to_owned),
    })
}

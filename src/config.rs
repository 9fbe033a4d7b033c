//! Layered runtime settings.
//!
//! Values come from built-in defaults, then an optional file named by
//! `MIRRORSHIFT_CONFIG`, then `MIRRORSHIFT__<SECTION>__<KEY>` environment
//! variables.

use crate::migration::{
    adapters::{
        azure_devops::AzureDevOpsConfig, credentials::SealedBoxUnwrapper,
        credentials::decode_secret_key, git::GitMirrorTool, github::GitHubConfig,
        postgres::MigrationPgPool,
    },
    ports::CredentialError,
    services::{DEFAULT_WORKSPACE_PREFIX, WorkspaceManager},
};
use config::{Config, ConfigError, Environment, File};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable naming an optional settings file.
pub const CONFIG_PATH_VAR: &str = "MIRRORSHIFT_CONFIG";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "MIRRORSHIFT";

/// Errors raised while loading or applying settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source could not be read or deserialised.
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),

    /// A configured address is not a valid URL.
    #[error("setting {key} is not a valid URL: {source}")]
    InvalidUrl {
        /// Dotted setting name.
        key: &'static str,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The database pool could not be built.
    #[error("failed to connect to the migration registry: {0}")]
    Database(#[from] PoolError),

    /// The credential key could not be decoded.
    #[error("setting credentials.secret_key is unusable: {0}")]
    SecretKey(#[from] CredentialError),
}

/// Complete runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Azure DevOps connection.
    pub source: SourceSettings,
    /// GitHub connection.
    pub target: TargetSettings,
    /// Local git invocation.
    pub git: GitSettings,
    /// Scratch directory placement.
    pub workspace: WorkspaceSettings,
    /// Credential unsealing.
    #[serde(default)]
    pub credentials: CredentialSettings,
    /// Record storage.
    #[serde(default)]
    pub registry: RegistrySettings,
    /// Log output.
    pub log: LogSettings,
}

/// Source host settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// Service root.
    pub api_base_url: String,
    /// `api-version` query value.
    pub api_version: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Target host settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSettings {
    /// REST API root.
    pub api_base_url: String,
    /// Git transport root.
    pub git_base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Repository creation attempts.
    pub max_attempts: u32,
    /// Backoff unit between creation attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Whether created repositories are private.
    pub private: bool,
}

/// Git settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSettings {
    /// Executable to run.
    pub program: PathBuf,
    /// Upper bound for one clone or push, in seconds.
    pub timeout_secs: Option<u64>,
}

/// Workspace settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSettings {
    /// Parent directory; the system temporary directory when unset.
    pub root: Option<PathBuf>,
    /// Directory name prefix.
    pub prefix: String,
}

/// Credential settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialSettings {
    /// Base64 X25519 secret key that opens sealed credentials.
    pub secret_key: Option<SecretString>,
}

/// Registry settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrySettings {
    /// `PostgreSQL` connection string; records stay in memory when unset.
    pub database_url: Option<SecretString>,
}

/// Log settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Settings {
    /// Loads settings from defaults, the `MIRRORSHIFT_CONFIG` file and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source is unreadable or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, SettingsError> {
        let file = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Loads settings using `file` in place of `MIRRORSHIFT_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source is unreadable or a value
    /// has the wrong type.
    pub fn load_from(file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("source.api_base_url", "https://dev.azure.com/")?
            .set_default("source.api_version", "7.1")?
            .set_default("source.timeout_secs", 30)?
            .set_default("target.api_base_url", "https://api.github.com/")?
            .set_default("target.git_base_url", "https://github.com/")?
            .set_default("target.timeout_secs", 30)?
            .set_default("target.max_attempts", 3)?
            .set_default("target.retry_backoff_ms", 1000)?
            .set_default("target.private", true)?
            .set_default("git.program", "git")?
            .set_default("workspace.prefix", DEFAULT_WORKSPACE_PREFIX)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl SourceSettings {
    /// Builds the Azure DevOps client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for an unparsable base URL.
    pub fn client_config(&self) -> Result<AzureDevOpsConfig, SettingsError> {
        let base_url = parse_url("source.api_base_url", &self.api_base_url)?;
        let mut config =
            AzureDevOpsConfig::new(base_url).with_timeout(Duration::from_secs(self.timeout_secs));
        config.api_version.clone_from(&self.api_version);
        Ok(config)
    }
}

impl TargetSettings {
    /// Builds the GitHub client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for an unparsable base URL.
    pub fn client_config(&self) -> Result<GitHubConfig, SettingsError> {
        let api_base_url = parse_url("target.api_base_url", &self.api_base_url)?;
        let git_base_url = parse_url("target.git_base_url", &self.git_base_url)?;
        let mut config = GitHubConfig::new(api_base_url, git_base_url).with_retries(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        );
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.private = self.private;
        Ok(config)
    }
}

impl GitSettings {
    /// Builds the git mirror tool.
    #[must_use]
    pub fn mirror_tool(&self) -> GitMirrorTool {
        GitMirrorTool::new(&self.program).with_timeout(self.timeout_secs.map(Duration::from_secs))
    }
}

impl WorkspaceSettings {
    /// Builds the workspace manager.
    #[must_use]
    pub fn manager(&self) -> WorkspaceManager {
        let manager = self
            .root
            .as_ref()
            .map_or_else(WorkspaceManager::system, WorkspaceManager::new);
        manager.with_prefix(self.prefix.clone())
    }
}

impl CredentialSettings {
    /// Builds the credential unwrapper; without a key every unseal fails
    /// with [`CredentialError::KeyUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::SecretKey`] when the key is not a base64
    /// 32-byte value.
    pub fn unwrapper(&self) -> Result<SealedBoxUnwrapper, SettingsError> {
        match &self.secret_key {
            Some(encoded) => Ok(SealedBoxUnwrapper::new(decode_secret_key(encoded)?)),
            None => Ok(SealedBoxUnwrapper::without_key()),
        }
    }
}

impl RegistrySettings {
    /// Builds a connection pool when a database URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Database`] when no connection can be
    /// established.
    pub fn pool(&self) -> Result<Option<MigrationPgPool>, SettingsError> {
        let Some(url) = &self.database_url else {
            return Ok(None);
        };
        let manager = ConnectionManager::<PgConnection>::new(url.expose_secret());
        Ok(Some(Pool::builder().build(manager)?))
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|source| SettingsError::InvalidUrl { key, source })
}

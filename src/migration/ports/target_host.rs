//! Target host port: idempotent repository creation and push addresses.

use crate::migration::domain::{AuthenticatedUrl, TargetLocation, TargetRepositoryName};
use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Result type for target host operations.
pub type TargetHostResult<T> = Result<T, TargetHostError>;

/// Outcome of ensuring that a target repository exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCreation {
    /// The repository was created by this call.
    Created {
        /// `owner/name` reported by the host.
        full_name: String,
    },
    /// A repository with the same name already existed.
    AlreadyExists,
}

/// Repository summary used for browsing the target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRepositorySummary {
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Whether the repository is private.
    pub private: bool,
}

/// Write access to the target version-control host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetHost: Send + Sync {
    /// Creates the repository unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`TargetHostError`] for every failure other than the
    /// repository already existing.
    async fn ensure_repository(
        &self,
        credential: &SecretString,
        location: &TargetLocation,
        name: &TargetRepositoryName,
    ) -> TargetHostResult<RepositoryCreation>;

    /// Lists organisations the credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`TargetHostError`] on transport failures or non-success
    /// responses.
    async fn list_organizations(&self, credential: &SecretString)
    -> TargetHostResult<Vec<String>>;

    /// Lists repositories in a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`TargetHostError`] on transport failures or non-success
    /// responses.
    async fn list_repositories(
        &self,
        credential: &SecretString,
        location: &TargetLocation,
    ) -> TargetHostResult<Vec<TargetRepositorySummary>>;

    /// Builds the push address with `credential` embedded.
    ///
    /// # Errors
    ///
    /// Returns [`TargetHostError::InvalidUrl`] when the address cannot be
    /// built.
    fn push_url(
        &self,
        location: &TargetLocation,
        name: &TargetRepositoryName,
        credential: &SecretString,
    ) -> TargetHostResult<AuthenticatedUrl>;
}

/// Errors returned by target host adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetHostError {
    /// The host answered with a non-success status.
    #[error("target host returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Host-provided message, or the raw body when none was structured.
        message: String,
    },

    /// The request did not complete.
    #[error("target host request failed: {0}")]
    Network(String),

    /// The request exceeded its timeout.
    #[error("target host request timed out")]
    Timeout,

    /// The host answered with a body that could not be parsed.
    #[error("target host returned an unreadable response: {0}")]
    InvalidResponse(String),

    /// An address could not be built.
    #[error("invalid target host URL: {0}")]
    InvalidUrl(String),
}

impl TargetHostError {
    /// Returns `true` for failures worth another creation attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::InvalidUrl(_) => false,
        }
    }
}

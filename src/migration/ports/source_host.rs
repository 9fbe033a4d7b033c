//! Source host port: repository lookup and clone addresses.

use crate::migration::domain::{AuthenticatedUrl, SourceLocation};
use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Result type for source host operations.
pub type SourceHostResult<T> = Result<T, SourceHostError>;

/// Repository metadata returned by the source host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    /// Host-assigned repository identifier.
    pub id: String,
    /// Repository name as shown on the source host.
    pub name: String,
    /// Clonable network address, without credentials.
    pub remote_url: Url,
    /// Default branch reference, if the host reports one.
    pub default_branch: Option<String>,
}

/// Read access to the source version-control host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Lists repositories visible under an organisation and project.
    ///
    /// # Errors
    ///
    /// Returns [`SourceHostError`] on transport failures or non-success
    /// responses.
    async fn list_repositories(
        &self,
        credential: &SecretString,
        organization: &str,
        project: &str,
    ) -> SourceHostResult<Vec<SourceRepository>>;

    /// Fetches one repository.
    ///
    /// # Errors
    ///
    /// Returns [`SourceHostError`] on transport failures or non-success
    /// responses, including an unknown repository.
    async fn fetch_repository(
        &self,
        credential: &SecretString,
        location: &SourceLocation,
    ) -> SourceHostResult<SourceRepository>;

    /// Builds the clone address with `credential` embedded.
    ///
    /// # Errors
    ///
    /// Returns [`SourceHostError::InvalidUrl`] when the remote address cannot
    /// carry credentials.
    fn clone_url(
        &self,
        repository: &SourceRepository,
        credential: &SecretString,
    ) -> SourceHostResult<AuthenticatedUrl>;
}

/// Errors returned by source host adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceHostError {
    /// The host answered with a non-success status.
    #[error("source host returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Host-provided message, or the raw body when none was structured.
        message: String,
    },

    /// The request did not complete.
    #[error("source host request failed: {0}")]
    Network(String),

    /// The request exceeded its timeout.
    #[error("source host request timed out")]
    Timeout,

    /// The host answered with a body that could not be parsed.
    #[error("source host returned an unreadable response: {0}")]
    InvalidResponse(String),

    /// An address could not be built.
    #[error("invalid source host URL: {0}")]
    InvalidUrl(String),
}

//! Azure DevOps source host client.
//!
//! Talks to the Git repositories REST surface
//! (`/{organization}/{project}/_apis/git/repositories`) with the personal
//! access token sent as the password of HTTP basic authentication.

use crate::migration::{
    domain::{AuthenticatedUrl, SourceLocation},
    ports::{SourceHost, SourceHostError, SourceHostResult, SourceRepository},
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "7.1";

/// Username placed in clone URLs; Azure DevOps ignores it for PATs.
const CLONE_USERNAME: &str = "pat";

/// Connection settings for [`AzureDevOpsClient`].
#[derive(Debug, Clone)]
pub struct AzureDevOpsConfig {
    /// Service root, for example `https://dev.azure.com/`.
    pub base_url: Url,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AzureDevOpsConfig {
    /// Creates settings for `base_url` with the default version and a 30 s
    /// timeout.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_version: DEFAULT_API_VERSION.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`SourceHost`] backed by the Azure DevOps REST API.
#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    client: Client,
    config: AzureDevOpsConfig,
}

#[derive(Debug, Deserialize)]
struct RepositoryList {
    value: Vec<RepositoryBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryBody {
    id: String,
    name: String,
    remote_url: String,
    default_branch: Option<String>,
}

impl TryFrom<RepositoryBody> for SourceRepository {
    type Error = SourceHostError;

    fn try_from(body: RepositoryBody) -> Result<Self, Self::Error> {
        let remote_url = Url::parse(&body.remote_url).map_err(|err| {
            SourceHostError::InvalidResponse(format!(
                "repository {} has an invalid remote URL: {err}",
                body.name
            ))
        })?;
        Ok(Self {
            id: body.id,
            name: body.name,
            remote_url,
            default_branch: body.default_branch,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl AzureDevOpsClient {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceHostError::Network`] when the HTTP client cannot be
    /// initialised.
    pub fn new(config: AzureDevOpsConfig) -> SourceHostResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SourceHostError::Network(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, segments: &[&str]) -> SourceHostResult<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceHostError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        credential: &SecretString,
    ) -> SourceHostResult<T> {
        debug!(%url, "querying source host");
        let response = self
            .client
            .get(url)
            .basic_auth("", Some(credential.expose_secret()))
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }
}

fn map_transport_error(err: reqwest::Error) -> SourceHostError {
    if err.is_timeout() {
        SourceHostError::Timeout
    } else {
        SourceHostError::Network(err.without_url().to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> SourceHostResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| SourceHostError::InvalidResponse(err.without_url().to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(SourceHostError::Api {
        status: status.as_u16(),
        message: api_message(&body, status.canonical_reason()),
    })
}

/// Extracts the human-readable message from an error body.
fn api_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .or_else(|| Some(body.trim().to_owned()).filter(|text| !text.is_empty()))
        .or_else(|| reason.map(str::to_owned))
        .unwrap_or_default()
}

#[async_trait]
impl SourceHost for AzureDevOpsClient {
    async fn list_repositories(
        &self,
        credential: &SecretString,
        organization: &str,
        project: &str,
    ) -> SourceHostResult<Vec<SourceRepository>> {
        let url = self.endpoint(&[organization, project, "_apis", "git", "repositories"])?;
        let list: RepositoryList = self.get_json(url, credential).await?;
        list.value
            .into_iter()
            .map(SourceRepository::try_from)
            .collect()
    }

    async fn fetch_repository(
        &self,
        credential: &SecretString,
        location: &SourceLocation,
    ) -> SourceHostResult<SourceRepository> {
        let url = self.endpoint(&[
            location.organization(),
            location.project(),
            "_apis",
            "git",
            "repositories",
            location.repository(),
        ])?;
        let body: RepositoryBody = self.get_json(url, credential).await?;
        SourceRepository::try_from(body)
    }

    fn clone_url(
        &self,
        repository: &SourceRepository,
        credential: &SecretString,
    ) -> SourceHostResult<AuthenticatedUrl> {
        AuthenticatedUrl::with_credentials(&repository.remote_url, CLONE_USERNAME, credential)
            .map_err(|err| SourceHostError::InvalidUrl(err.to_string()))
    }
}

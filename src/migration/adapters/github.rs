//! GitHub target host client.
//!
//! Repository creation is idempotent from the caller's point of view: a
//! `422` whose structured payload reports a name conflict is returned as
//! [`RepositoryCreation::AlreadyExists`]. Transient failures are retried with
//! linear backoff.

use crate::migration::{
    domain::{AuthenticatedUrl, TargetLocation, TargetNamespace, TargetRepositoryName},
    ports::{
        RepositoryCreation, TargetHost, TargetHostError, TargetHostResult,
        TargetRepositorySummary,
    },
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("mirrorshift/", env!("CARGO_PKG_VERSION"));
const PUSH_USERNAME: &str = "x-access-token";
const PAGE_SIZE: usize = 100;

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API root, for example `https://api.github.com/`.
    pub api_base_url: Url,
    /// Git transport root, for example `https://github.com/`.
    pub git_base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Creation attempts before a transient failure is reported.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Whether created repositories are private.
    pub private: bool,
}

impl GitHubConfig {
    /// Creates settings with three attempts, one second of backoff, a 30 s
    /// timeout and private repositories.
    #[must_use]
    pub const fn new(api_base_url: Url, git_base_url: Url) -> Self {
        Self {
            api_base_url,
            git_base_url,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            private: true,
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retries(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_backoff = retry_backoff;
        self
    }
}

/// [`TargetHost`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    name: String,
    full_name: String,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct OrganizationBody {
    login: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    field: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn reports_name_conflict(&self) -> bool {
        let conflicting_detail = self.errors.iter().any(|detail| {
            detail.field.as_deref() == Some("name")
                && (detail.code.as_deref() == Some("already_exists")
                    || detail
                        .message
                        .as_deref()
                        .is_some_and(mentions_existing_name))
        });
        conflicting_detail || self.message.as_deref().is_some_and(mentions_existing_name)
    }

    /// Top-level message followed by every detail, e.g.
    /// `Validation Failed: name is too long`.
    fn describe(self) -> Option<String> {
        let details: Vec<String> = self
            .errors
            .into_iter()
            .filter_map(ErrorDetail::describe)
            .collect();
        if details.is_empty() {
            return self.message;
        }
        let joined = details.join("; ");
        Some(match self.message {
            Some(message) => format!("{}: {joined}", message.trim_end_matches('.')),
            None => joined,
        })
    }
}

impl ErrorDetail {
    fn describe(self) -> Option<String> {
        if let Some(message) = self.message.filter(|text| !text.trim().is_empty()) {
            return Some(message);
        }
        match (self.field, self.code) {
            (Some(field), Some(code)) => Some(format!("{field} {code}")),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }
}

fn mentions_existing_name(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already exists")
}

impl GitHubClient {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetHostError::Network`] when the HTTP client cannot be
    /// initialised.
    pub fn new(config: GitHubConfig) -> TargetHostResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| TargetHostError::Network(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn api_endpoint(&self, segments: &[&str]) -> TargetHostResult<Url> {
        join_segments(&self.config.api_base_url, segments)
    }

    fn authorized(&self, request: RequestBuilder, credential: &SecretString) -> RequestBuilder {
        request
            .bearer_auth(credential.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn create_once(
        &self,
        credential: &SecretString,
        location: &TargetLocation,
        name: &TargetRepositoryName,
    ) -> TargetHostResult<RepositoryCreation> {
        let url = match location.namespace() {
            TargetNamespace::User(_) => self.api_endpoint(&["user", "repos"])?,
            TargetNamespace::Organization(org) => {
                self.api_endpoint(&["orgs", org.as_str(), "repos"])?
            }
        };
        let body = CreateRepositoryBody {
            name: name.as_str(),
            private: self.config.private,
        };

        debug!(%url, repository = %name, "creating target repository");
        let response = self
            .authorized(self.client.post(url), credential)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let text = response.text().await.unwrap_or_default();
            let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            if parsed.reports_name_conflict() {
                return Ok(RepositoryCreation::AlreadyExists);
            }
            return Err(api_error(status, parsed.describe(), &text));
        }

        let created: RepositoryBody = read_json(response).await?;
        Ok(RepositoryCreation::Created {
            full_name: created.full_name,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        credential: &SecretString,
    ) -> TargetHostResult<T> {
        debug!(%url, "querying target host");
        let response = self
            .authorized(self.client.get(url), credential)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &Url,
        credential: &SecretString,
    ) -> TargetHostResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1_u32.. {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<T> = self.get_json(page_url, credential).await?;
            let last_page = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(items)
    }
}

fn join_segments(base: &Url, segments: &[&str]) -> TargetHostResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TargetHostError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn map_transport_error(err: reqwest::Error) -> TargetHostError {
    if err.is_timeout() {
        TargetHostError::Timeout
    } else {
        TargetHostError::Network(err.without_url().to_string())
    }
}

fn api_error(status: StatusCode, message: Option<String>, body: &str) -> TargetHostError {
    let fallback = || {
        Some(body.trim().to_owned())
            .filter(|text| !text.is_empty())
            .or_else(|| status.canonical_reason().map(str::to_owned))
            .unwrap_or_default()
    };
    TargetHostError::Api {
        status: status.as_u16(),
        message: message.unwrap_or_else(fallback),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> TargetHostResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| TargetHostError::InvalidResponse(err.without_url().to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    Err(api_error(status, parsed.describe(), &text))
}

#[async_trait]
impl TargetHost for GitHubClient {
    async fn ensure_repository(
        &self,
        credential: &SecretString,
        location: &TargetLocation,
        name: &TargetRepositoryName,
    ) -> TargetHostResult<RepositoryCreation> {
        let mut attempt: u32 = 1;
        loop {
            match self.create_once(credential, location, name).await {
                Err(err) if err.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        attempt,
                        error = %err,
                        repository = %name,
                        "repository creation failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Ok(RepositoryCreation::AlreadyExists) => {
                    info!(
                        owner = location.owner(),
                        repository = %name,
                        "target repository already exists"
                    );
                    return Ok(RepositoryCreation::AlreadyExists);
                }
                outcome => return outcome,
            }
        }
    }

    async fn list_organizations(
        &self,
        credential: &SecretString,
    ) -> TargetHostResult<Vec<String>> {
        let url = self.api_endpoint(&["user", "orgs"])?;
        let organizations: Vec<OrganizationBody> = self.get_all_pages(&url, credential).await?;
        Ok(organizations.into_iter().map(|org| org.login).collect())
    }

    async fn list_repositories(
        &self,
        credential: &SecretString,
        location: &TargetLocation,
    ) -> TargetHostResult<Vec<TargetRepositorySummary>> {
        let url = match location.namespace() {
            TargetNamespace::User(_) => {
                let mut url = self.api_endpoint(&["user", "repos"])?;
                url.query_pairs_mut().append_pair("affiliation", "owner");
                url
            }
            TargetNamespace::Organization(org) => {
                self.api_endpoint(&["orgs", org.as_str(), "repos"])?
            }
        };
        let repositories: Vec<RepositoryBody> = self.get_all_pages(&url, credential).await?;
        Ok(repositories
            .into_iter()
            .map(|repo| TargetRepositorySummary {
                name: repo.name,
                full_name: repo.full_name,
                private: repo.private,
            })
            .collect())
    }

    fn push_url(
        &self,
        location: &TargetLocation,
        name: &TargetRepositoryName,
        credential: &SecretString,
    ) -> TargetHostResult<AuthenticatedUrl> {
        let repository = format!("{name}.git");
        let url = join_segments(
            &self.config.git_base_url,
            &[location.owner(), repository.as_str()],
        )?;
        AuthenticatedUrl::with_credentials(&url, PUSH_USERNAME, credential)
            .map_err(|err| TargetHostError::InvalidUrl(err.to_string()))
    }
}

//! In-memory source and target host adapters.
//!
//! These adapters model host behaviour without network access. They are
//! suitable for unit and integration tests and for local deterministic
//! orchestration flows.

use crate::migration::{
    domain::{AuthenticatedUrl, SourceLocation, TargetLocation, TargetRepositoryName},
    ports::{
        RepositoryCreation, SourceHost, SourceHostError, SourceHostResult, SourceRepository,
        TargetHost, TargetHostError, TargetHostResult, TargetRepositorySummary,
    },
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use url::Url;

/// In-memory source host keyed by `organization/project`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceHost {
    state: Arc<RwLock<InMemorySourceState>>,
}

#[derive(Debug, Default)]
struct InMemorySourceState {
    projects: BTreeMap<(String, String), Vec<SourceRepository>>,
    accepted_token: Option<String>,
}

impl InMemorySourceHost {
    /// Creates an empty source host that accepts any credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a repository to a project.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn add_repository(
        &self,
        organization: &str,
        project: &str,
        repository: SourceRepository,
    ) -> SourceHostResult<()> {
        let mut state = self.state.write().map_err(source_lock_error)?;
        state
            .projects
            .entry((organization.to_owned(), project.to_owned()))
            .or_default()
            .push(repository);
        Ok(())
    }

    /// Restricts access to a single credential; others receive `401`.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn require_token(&self, token: impl Into<String>) -> SourceHostResult<()> {
        let mut state = self.state.write().map_err(source_lock_error)?;
        state.accepted_token = Some(token.into());
        Ok(())
    }
}

fn source_lock_error(err: impl ToString) -> SourceHostError {
    SourceHostError::Network(err.to_string())
}

fn authorize(state: &InMemorySourceState, credential: &SecretString) -> SourceHostResult<()> {
    match &state.accepted_token {
        Some(token) if token != credential.expose_secret() => Err(SourceHostError::Api {
            status: 401,
            message: "the personal access token is not valid".to_owned(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl SourceHost for InMemorySourceHost {
    async fn list_repositories(
        &self,
        credential: &SecretString,
        organization: &str,
        project: &str,
    ) -> SourceHostResult<Vec<SourceRepository>> {
        let state = self.state.read().map_err(source_lock_error)?;
        authorize(&state, credential)?;
        Ok(state
            .projects
            .get(&(organization.to_owned(), project.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_repository(
        &self,
        credential: &SecretString,
        location: &SourceLocation,
    ) -> SourceHostResult<SourceRepository> {
        let state = self.state.read().map_err(source_lock_error)?;
        authorize(&state, credential)?;
        state
            .projects
            .get(&(
                location.organization().to_owned(),
                location.project().to_owned(),
            ))
            .and_then(|repositories| {
                repositories.iter().find(|repository| {
                    repository.id == location.repository()
                        || repository.name == location.repository()
                })
            })
            .cloned()
            .ok_or_else(|| SourceHostError::Api {
                status: 404,
                message: format!("repository {location} does not exist"),
            })
    }

    fn clone_url(
        &self,
        repository: &SourceRepository,
        credential: &SecretString,
    ) -> SourceHostResult<AuthenticatedUrl> {
        AuthenticatedUrl::with_credentials(&repository.remote_url, "pat", credential)
            .map_err(|err| SourceHostError::InvalidUrl(err.to_string()))
    }
}

/// In-memory target host tracking repositories per owner.
#[derive(Debug, Clone)]
pub struct InMemoryTargetHost {
    base_url: Url,
    state: Arc<RwLock<InMemoryTargetState>>,
}

#[derive(Debug, Default)]
struct InMemoryTargetState {
    repositories: BTreeSet<(String, String)>,
    organizations: BTreeSet<String>,
    creation_failure: Option<TargetHostError>,
    creation_calls: usize,
}

impl InMemoryTargetHost {
    /// Creates an empty target host whose push URLs start with `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            state: Arc::default(),
        }
    }

    /// Registers an existing repository.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn add_existing(&self, owner: &str, name: &str) -> TargetHostResult<()> {
        let mut state = self.state.write().map_err(target_lock_error)?;
        state
            .repositories
            .insert((owner.to_owned(), name.to_owned()));
        Ok(())
    }

    /// Registers an organisation visible to every credential.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn add_organization(&self, name: &str) -> TargetHostResult<()> {
        let mut state = self.state.write().map_err(target_lock_error)?;
        state.organizations.insert(name.to_owned());
        Ok(())
    }

    /// Makes every subsequent creation attempt fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn fail_creation_with(&self, error: TargetHostError) -> TargetHostResult<()> {
        let mut state = self.state.write().map_err(target_lock_error)?;
        state.creation_failure = Some(error);
        Ok(())
    }

    /// Returns `true` when `owner/name` exists.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn contains(&self, owner: &str, name: &str) -> TargetHostResult<bool> {
        let state = self.state.read().map_err(target_lock_error)?;
        Ok(state
            .repositories
            .contains(&(owner.to_owned(), name.to_owned())))
    }

    /// Returns how many creation attempts were made.
    ///
    /// # Errors
    ///
    /// Returns host errors when lock acquisition fails.
    pub fn creation_calls(&self) -> TargetHostResult<usize> {
        let state = self.state.read().map_err(target_lock_error)?;
        Ok(state.creation_calls)
    }
}

fn target_lock_error(err: impl ToString) -> TargetHostError {
    TargetHostError::Network(err.to_string())
}

#[async_trait]
impl TargetHost for InMemoryTargetHost {
    async fn ensure_repository(
        &self,
        _credential: &SecretString,
        location: &TargetLocation,
        name: &TargetRepositoryName,
    ) -> TargetHostResult<RepositoryCreation> {
        let mut state = self.state.write().map_err(target_lock_error)?;
        state.creation_calls += 1;
        if let Some(error) = &state.creation_failure {
            return Err(error.clone());
        }

        let key = (location.owner().to_owned(), name.as_str().to_owned());
        if !state.repositories.insert(key) {
            return Ok(RepositoryCreation::AlreadyExists);
        }
        Ok(RepositoryCreation::Created {
            full_name: format!("{}/{name}", location.owner()),
        })
    }

    async fn list_organizations(
        &self,
        _credential: &SecretString,
    ) -> TargetHostResult<Vec<String>> {
        let state = self.state.read().map_err(target_lock_error)?;
        Ok(state.organizations.iter().cloned().collect())
    }

    async fn list_repositories(
        &self,
        _credential: &SecretString,
        location: &TargetLocation,
    ) -> TargetHostResult<Vec<TargetRepositorySummary>> {
        let state = self.state.read().map_err(target_lock_error)?;
        Ok(state
            .repositories
            .iter()
            .filter(|(owner, _)| owner == location.owner())
            .map(|(owner, name)| TargetRepositorySummary {
                name: name.clone(),
                full_name: format!("{owner}/{name}"),
                private: true,
            })
            .collect())
    }

    fn push_url(
        &self,
        location: &TargetLocation,
        name: &TargetRepositoryName,
        credential: &SecretString,
    ) -> TargetHostResult<AuthenticatedUrl> {
        let url = self
            .base_url
            .join(&format!("{}/{name}.git", location.owner()))
            .map_err(|err| TargetHostError::InvalidUrl(err.to_string()))?;
        AuthenticatedUrl::with_credentials(&url, "x-access-token", credential)
            .map_err(|err| TargetHostError::InvalidUrl(err.to_string()))
    }
}

//! Source and target repository locators.

use super::MigrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository on the source host, addressed as
/// `organization/project/repository`.
///
/// The repository segment may be either the repository name or its host
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceLocation {
    organization: String,
    project: String,
    repository: String,
}

impl SourceLocation {
    /// Parses a source location.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::InvalidSourceLocation`] unless the
    /// value holds exactly three non-empty slash-delimited segments. Interior
    /// spaces are kept; a segment may not start or end with whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, MigrationDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let mut segments = normalized.split('/');
        let organization = segments.next().unwrap_or_default();
        let project = segments.next().unwrap_or_default();
        let repository = segments.next().unwrap_or_default();
        let is_valid = [organization, project, repository]
            .iter()
            .all(|segment| !segment.is_empty() && segment.trim() == *segment)
            && segments.next().is_none();

        if !is_valid {
            return Err(MigrationDomainError::InvalidSourceLocation(raw));
        }

        Ok(Self {
            organization: organization.to_owned(),
            project: project.to_owned(),
            repository: repository.to_owned(),
        })
    }

    /// Returns the organisation segment.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Returns the project segment.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the repository name or identifier segment.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.repository)
    }
}

impl TryFrom<String> for SourceLocation {
    type Error = MigrationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SourceLocation> for String {
    fn from(location: SourceLocation) -> Self {
        location.to_string()
    }
}

/// Namespace that will own the migrated repository on the target host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetNamespace {
    /// The account of the authenticated user.
    User(String),
    /// An organisation the authenticated user can create repositories in.
    Organization(String),
}

/// Repository owner on the target host, written `user:<login>` or
/// `org:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetLocation {
    namespace: TargetNamespace,
}

impl TargetLocation {
    /// Parses a target location.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::InvalidTargetLocation`] when the kind
    /// prefix is unknown or the owner is empty or contains `/` or whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, MigrationDomainError> {
        let raw = value.into();
        let Some((kind, owner)) = raw.trim().split_once(':') else {
            return Err(MigrationDomainError::InvalidTargetLocation(raw));
        };
        let owner_is_valid = !owner.is_empty()
            && !owner.contains('/')
            && !owner.chars().any(char::is_whitespace);
        if !owner_is_valid {
            return Err(MigrationDomainError::InvalidTargetLocation(raw));
        }

        let namespace = match kind.to_ascii_lowercase().as_str() {
            "user" => TargetNamespace::User(owner.to_owned()),
            "org" | "organization" => TargetNamespace::Organization(owner.to_owned()),
            _ => return Err(MigrationDomainError::InvalidTargetLocation(raw)),
        };
        Ok(Self { namespace })
    }

    /// Returns the namespace.
    #[must_use]
    pub const fn namespace(&self) -> &TargetNamespace {
        &self.namespace
    }

    /// Returns the owning login or organisation name.
    #[must_use]
    pub fn owner(&self) -> &str {
        match &self.namespace {
            TargetNamespace::User(owner) | TargetNamespace::Organization(owner) => owner,
        }
    }
}

impl fmt::Display for TargetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            TargetNamespace::User(login) => write!(f, "user:{login}"),
            TargetNamespace::Organization(name) => write!(f, "org:{name}"),
        }
    }
}

impl TryFrom<String> for TargetLocation {
    type Error = MigrationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TargetLocation> for String {
    fn from(location: TargetLocation) -> Self {
        location.to_string()
    }
}

//! Target repository name normalisation.

use super::MigrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository name accepted by the target host.
///
/// Names are lower-case, restricted to `[a-z0-9._-]`, never start or end
/// with a separator, and never contain two separators in a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRepositoryName(String);

impl TargetRepositoryName {
    /// Derives a target name from a source repository name.
    ///
    /// Characters outside `[a-z0-9._-]` become `-`, each run of separators
    /// collapses to its first character, and leading or trailing separators
    /// are trimmed. Deriving from an already normalised name returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::EmptyRepositoryName`] when nothing
    /// usable remains.
    pub fn derive(source_name: &str) -> Result<Self, MigrationDomainError> {
        let mut normalized = String::with_capacity(source_name.len());
        let mut previous_was_separator = false;

        for ch in source_name.chars().flat_map(char::to_lowercase) {
            let mapped = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || is_separator(ch) {
                ch
            } else {
                '-'
            };
            let separator = is_separator(mapped);
            if separator && previous_was_separator {
                continue;
            }
            normalized.push(mapped);
            previous_was_separator = separator;
        }

        let trimmed = normalized.trim_matches(is_separator);
        if trimmed.is_empty() {
            return Err(MigrationDomainError::EmptyRepositoryName(
                source_name.to_owned(),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_separator(ch: char) -> bool {
    matches!(ch, '-' | '_' | '.')
}

impl AsRef<str> for TargetRepositoryName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TargetRepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

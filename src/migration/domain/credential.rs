//! Sealed credentials and credential-bearing URLs.

use super::MigrationDomainError;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use url::Url;

/// At-rest credential in its sealed, opaque form.
///
/// Only the ciphertext is ever stored. Unsealing happens transiently inside
/// the transfer engine through a
/// [`CredentialUnwrapper`](crate::migration::ports::CredentialUnwrapper).
#[derive(Clone, PartialEq, Eq)]
pub struct SealedCredential(String);

impl SealedCredential {
    /// Wraps a sealed credential value.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::EmptySealedCredential`] when the value
    /// is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, MigrationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MigrationDomainError::EmptySealedCredential);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the sealed representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedCredential(..)")
    }
}

/// Source and target credentials bound to one migration at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCredentials {
    source: SealedCredential,
    target: SealedCredential,
}

impl MigrationCredentials {
    /// Pairs the sealed source and target credentials.
    #[must_use]
    pub const fn new(source: SealedCredential, target: SealedCredential) -> Self {
        Self { source, target }
    }

    /// Returns the sealed source-host credential.
    #[must_use]
    pub const fn source(&self) -> &SealedCredential {
        &self.source
    }

    /// Returns the sealed target-host credential.
    #[must_use]
    pub const fn target(&self) -> &SealedCredential {
        &self.target
    }
}

/// Remote URL with an embedded secret.
///
/// The full URL is only reachable through [`Self::expose`]; `Display` and
/// `Debug` show the URL with its credentials stripped.
pub struct AuthenticatedUrl {
    full: SecretString,
    /// Percent-encoded form first, then the raw secret.
    secrets: Vec<SecretString>,
    redacted: String,
}

impl AuthenticatedUrl {
    /// Embeds `username` and `secret` into `base`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationDomainError::UnauthenticatableUrl`] when the URL
    /// scheme cannot carry credentials (for example `file:`).
    pub fn with_credentials(
        base: &Url,
        username: &str,
        secret: &SecretString,
    ) -> Result<Self, MigrationDomainError> {
        let redacted = strip_credentials(base);
        let mut full = base.clone();
        full.set_username(username)
            .and_then(|()| full.set_password(Some(secret.expose_secret())))
            .map_err(|()| MigrationDomainError::UnauthenticatableUrl(redacted.clone()))?;

        let raw = secret.expose_secret();
        let mut secrets = Vec::with_capacity(2);
        if let Some(encoded) = full.password().filter(|encoded| *encoded != raw) {
            secrets.push(SecretString::from(encoded.to_owned()));
        }
        if !raw.is_empty() {
            secrets.push(SecretString::from(raw.to_owned()));
        }

        Ok(Self {
            full: SecretString::from(full.to_string()),
            secrets,
            redacted,
        })
    }

    /// Wraps a URL that needs no credentials, such as a local path.
    #[must_use]
    pub fn anonymous(url: &Url) -> Self {
        Self {
            full: SecretString::from(url.to_string()),
            secrets: Vec::new(),
            redacted: strip_credentials(url),
        }
    }

    /// Returns the URL including credentials.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.full.expose_secret()
    }

    /// Returns the URL without credentials.
    #[must_use]
    pub fn redacted(&self) -> &str {
        &self.redacted
    }

    /// Removes every occurrence of the embedded secret, raw or
    /// percent-encoded, from `text`.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        let without_url = text.replace(self.expose(), &self.redacted);
        self.secrets.iter().fold(without_url, |scrubbed, secret| {
            scrubbed.replace(secret.expose_secret(), "***")
        })
    }
}

fn strip_credentials(url: &Url) -> String {
    let mut stripped = url.clone();
    // Both calls only fail for cannot-be-a-base URLs, which carry no credentials.
    let _username_cleared = stripped.set_username("").is_ok();
    let _password_cleared = stripped.set_password(None).is_ok();
    stripped.to_string()
}

impl fmt::Display for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for AuthenticatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthenticatedUrl")
            .field(&self.redacted)
            .finish()
    }
}

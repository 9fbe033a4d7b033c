//! Credential unwrapping port.

use crate::migration::domain::SealedCredential;
use secrecy::SecretString;
use thiserror::Error;

/// Result type for credential unwrapping.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Turns sealed at-rest credentials into usable secrets.
///
/// Implementations must keep the plaintext out of logs and error messages.
pub trait CredentialUnwrapper: Send + Sync {
    /// Unseals one credential for the duration of a transfer.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the key is unavailable or the sealed
    /// value is malformed or does not decrypt.
    fn unwrap_credential(&self, sealed: &SealedCredential) -> CredentialResult<SecretString>;
}

/// Errors returned while unsealing credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// No unsealing key is configured.
    #[error("credential key is not configured")]
    KeyUnavailable,

    /// The sealed value is not valid base64 or is truncated.
    #[error("sealed credential is malformed: {0}")]
    Malformed(String),

    /// The ciphertext did not authenticate under the configured key.
    #[error("sealed credential could not be decrypted")]
    Decryption,

    /// The plaintext is not valid UTF-8.
    #[error("decrypted credential is not valid UTF-8")]
    InvalidEncoding,
}

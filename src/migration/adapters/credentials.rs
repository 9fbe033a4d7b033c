//! Sealed-box credential adapter.
//!
//! Credentials are sealed with an X25519 public key (`crypto_box` sealed
//! boxes) and stored as standard base64. Only the holder of the matching
//! secret key can unseal them, so the intake boundary needs nothing but the
//! public key.

use crate::migration::{
    domain::SealedCredential,
    ports::{CredentialError, CredentialResult, CredentialUnwrapper},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use crypto_box::{PublicKey, SecretKey, aead::OsRng};
use secrecy::{ExposeSecret, SecretString};

const KEY_LENGTH: usize = 32;

/// Decodes a base64 X25519 secret key.
///
/// # Errors
///
/// Returns [`CredentialError::Malformed`] when the value is not base64 or
/// not 32 bytes long.
pub fn decode_secret_key(encoded: &SecretString) -> CredentialResult<SecretKey> {
    let bytes = STANDARD
        .decode(encoded.expose_secret().trim())
        .map_err(|_| CredentialError::Malformed("secret key is not valid base64".to_owned()))?;
    let key_bytes: [u8; KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        CredentialError::Malformed(format!("secret key must be {KEY_LENGTH} bytes"))
    })?;
    Ok(SecretKey::from_bytes(key_bytes))
}

/// Encodes a secret key as base64, for provisioning configuration.
#[must_use]
pub fn encode_secret_key(key: &SecretKey) -> SecretString {
    SecretString::from(STANDARD.encode(key.to_bytes()))
}

/// Generates a fresh secret key from the operating system RNG.
#[must_use]
pub fn generate_secret_key() -> SecretKey {
    SecretKey::generate(&mut OsRng)
}

/// Unseals credentials with an optional secret key.
pub struct SealedBoxUnwrapper {
    key: Option<SecretKey>,
}

impl SealedBoxUnwrapper {
    /// Creates an unwrapper holding `key`.
    #[must_use]
    pub const fn new(key: SecretKey) -> Self {
        Self { key: Some(key) }
    }

    /// Creates an unwrapper with no key; every unwrap fails with
    /// [`CredentialError::KeyUnavailable`].
    #[must_use]
    pub const fn without_key() -> Self {
        Self { key: None }
    }

    /// Returns a sealer for the matching public key.
    #[must_use]
    pub fn sealer(&self) -> Option<CredentialSealer> {
        self.key
            .as_ref()
            .map(|key| CredentialSealer::new(key.public_key()))
    }
}

impl CredentialUnwrapper for SealedBoxUnwrapper {
    fn unwrap_credential(&self, sealed: &SealedCredential) -> CredentialResult<SecretString> {
        let key = self.key.as_ref().ok_or(CredentialError::KeyUnavailable)?;
        let ciphertext = STANDARD.decode(sealed.as_str()).map_err(|_| {
            CredentialError::Malformed("sealed credential is not valid base64".to_owned())
        })?;
        let plaintext = key
            .unseal(&ciphertext)
            .map_err(|_| CredentialError::Decryption)?;
        let secret = String::from_utf8(plaintext).map_err(|_| CredentialError::InvalidEncoding)?;
        Ok(SecretString::from(secret))
    }
}

/// Seals plaintext credentials for storage.
#[derive(Clone)]
pub struct CredentialSealer {
    public_key: PublicKey,
}

impl CredentialSealer {
    /// Creates a sealer for `public_key`.
    #[must_use]
    pub const fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Seals a plaintext credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Decryption`] if the sealing primitive
    /// fails, and [`CredentialError::Malformed`] for an empty credential.
    pub fn seal(&self, plaintext: &SecretString) -> CredentialResult<SealedCredential> {
        let ciphertext = self
            .public_key
            .seal(&mut OsRng, plaintext.expose_secret().as_bytes())
            .map_err(|_| CredentialError::Decryption)?;
        SealedCredential::new(STANDARD.encode(ciphertext))
            .map_err(|err| CredentialError::Malformed(err.to_string()))
    }
}

//! Vault encryption.
//!
//! The controller only sees the [`Encryptor`] trait; the blob it produces is
//! opaque ciphertext. [`PasswordEncryptor`] is the bundled implementation:
//! argon2id password hashing feeding AES-256-GCM.
//!
//! # Blob format
//! ```text
//! hex( salt (32 bytes) || nonce (12 bytes) || ciphertext + auth_tag )
//! ```

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{KeyringError, Result};
use crate::vault::Vault;

/// Salt length in bytes.
const SALT_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Minimum encrypted payload size (salt + nonce + auth tag).
const MIN_ENCRYPTED_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Seals and opens the vault at rest.
///
/// `decrypt` must fail with [`KeyringError::WrongPassword`] when the
/// password does not match, and never return a partially decoded vault.
pub trait Encryptor: Send + Sync {
    /// Encrypt a vault under `password` into an opaque string.
    fn encrypt(&self, password: &str, vault: &Vault) -> Result<String>;

    /// Decrypt a blob produced by [`Encryptor::encrypt`].
    fn decrypt(&self, password: &str, blob: &str) -> Result<Vault>;
}

/// argon2id + AES-256-GCM vault encryptor.
#[derive(Clone)]
pub struct PasswordEncryptor {
    params: Params,
}

impl PasswordEncryptor {
    /// Encryptor with the argon2 recommended default cost.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Encryptor with explicit argon2 cost parameters.
    ///
    /// Blobs can only be opened with the same parameters they were sealed
    /// with.
    pub fn with_params(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost_kib, t_cost, p_cost, Some(32))
            .map_err(|e| KeyringError::Encryption(e.to_string()))?;
        Ok(Self { params })
    }

    /// Derive a 256-bit key from a password and salt.
    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut key = Zeroizing::new([0u8; 32]);
        argon
            .hash_password_into(password, salt, key.as_mut_slice())
            .map_err(|e| KeyringError::Encryption(e.to_string()))?;
        Ok(key)
    }

    /// Encrypt raw bytes. Returns `salt || nonce || ciphertext+tag`.
    pub fn seal(&self, plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let key = self.derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| KeyringError::Encryption(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| KeyringError::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&salt);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt bytes produced by [`PasswordEncryptor::seal`].
    ///
    /// Returns [`KeyringError::WrongPassword`] on authentication tag
    /// mismatch, which covers both a wrong password and tampered data.
    pub fn open(&self, encrypted: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if encrypted.len() < MIN_ENCRYPTED_LEN {
            return Err(KeyringError::CorruptedVault(format!(
                "encrypted data too short: {} < {MIN_ENCRYPTED_LEN}",
                encrypted.len()
            )));
        }

        let salt = &encrypted[..SALT_LEN];
        let nonce_bytes = &encrypted[SALT_LEN..SALT_LEN + NONCE_LEN];
        let ciphertext = &encrypted[SALT_LEN + NONCE_LEN..];

        let key = self.derive_key(password, salt)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| KeyringError::Encryption(e.to_string()))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| KeyringError::WrongPassword)
    }
}

impl Default for PasswordEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PasswordEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordEncryptor")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl Encryptor for PasswordEncryptor {
    fn encrypt(&self, password: &str, vault: &Vault) -> Result<String> {
        let plaintext = Zeroizing::new(vault.to_json()?);
        let sealed = self.seal(&plaintext, password.as_bytes())?;
        Ok(hex::encode(sealed))
    }

    fn decrypt(&self, password: &str, blob: &str) -> Result<Vault> {
        let sealed = hex::decode(blob.trim())
            .map_err(|e| KeyringError::CorruptedVault(format!("invalid blob encoding: {e}")))?;
        let plaintext = self.open(&sealed, password.as_bytes())?;
        Vault::from_json(&plaintext)
    }
}

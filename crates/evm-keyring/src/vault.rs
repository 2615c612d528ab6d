//! Serializable vault contents: the reconstruction data of every keyring.
//!
//! The vault is the unit of encryption. It holds secrets in plain form, so
//! it is zeroized on drop and its `Debug` output is redacted.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeyringError, Result};
use crate::keyring::Keyring;

/// Current vault format version.
pub const VAULT_VERSION: u32 = 1;

/// Variant tag plus minimal data needed to rebuild one keyring.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
#[serde(tag = "type")]
pub enum KeyringSnapshot {
    /// Mnemonic and the number of accounts derived from it.
    #[serde(rename = "HD Key Tree", rename_all = "camelCase")]
    Hd {
        /// Normalized BIP-39 phrase.
        mnemonic: String,
        /// Accounts derived so far (indices `0..number_of_accounts`).
        number_of_accounts: u32,
    },
    /// Imported raw keys in insertion order.
    #[serde(rename = "Simple Key Pair", rename_all = "camelCase")]
    Simple {
        /// `0x`-prefixed hex private keys.
        private_keys: Vec<String>,
    },
}

impl fmt::Debug for KeyringSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hd {
                number_of_accounts, ..
            } => f
                .debug_struct("Hd")
                .field("mnemonic", &"[REDACTED]")
                .field("number_of_accounts", number_of_accounts)
                .finish(),
            Self::Simple { private_keys } => f
                .debug_struct("Simple")
                .field("private_keys", &format_args!("[{} REDACTED]", private_keys.len()))
                .finish(),
        }
    }
}

/// Ordered keyring snapshots plus the format version.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Vault {
    /// Format version, see [`VAULT_VERSION`].
    pub version: u32,
    /// Keyrings in registration order.
    pub keyrings: Vec<KeyringSnapshot>,
}

impl Vault {
    /// Snapshot a set of live keyrings.
    pub fn from_keyrings(keyrings: &[Keyring]) -> Self {
        Self {
            version: VAULT_VERSION,
            keyrings: keyrings.iter().map(Keyring::snapshot).collect(),
        }
    }

    /// Rebuild live keyrings, re-deriving HD accounts.
    pub fn to_keyrings(&self) -> Result<Vec<Keyring>> {
        self.check_version()?;
        self.keyrings.iter().map(Keyring::from_snapshot).collect()
    }

    /// Reject vaults written by an unknown format version.
    pub fn check_version(&self) -> Result<()> {
        if self.version != VAULT_VERSION {
            return Err(KeyringError::CorruptedVault(format!(
                "unsupported version: {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Serialize to JSON bytes (the encryptor's plaintext).
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| KeyringError::Serialization(e.to_string()))
    }

    /// Parse JSON bytes produced by [`Vault::to_json`].
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let vault: Self = serde_json::from_slice(bytes)
            .map_err(|e| KeyringError::CorruptedVault(format!("invalid payload: {e}")))?;
        vault.check_version()?;
        Ok(vault)
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("version", &self.version)
            .field("keyrings", &self.keyrings)
            .finish()
    }
}

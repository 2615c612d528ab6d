//! Key sources: HD keyrings derived from a mnemonic, and simple keyrings
//! holding imported raw private keys.
//!
//! HD derivation follows BIP-32/BIP-44 on the Ethereum path
//! `m/44'/60'/0'/0/{index}`. The same phrase and index always produce the
//! same key, which is what lets a restored vault reproduce earlier accounts.

use std::fmt;

use alloy::primitives::{Address, B256, Signature};
use alloy::signers::SignerSync;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{KeyringError, Result};
use crate::keys;
use crate::mnemonic;
use crate::vault::KeyringSnapshot;

/// Variant tag for a keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyringKind {
    /// Mnemonic-backed hierarchical deterministic keyring.
    #[serde(rename = "HD Key Tree")]
    Hd,
    /// Fixed set of imported private keys.
    #[serde(rename = "Simple Key Pair")]
    Simple,
}

impl fmt::Display for KeyringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hd => f.write_str("HD Key Tree"),
            Self::Simple => f.write_str("Simple Key Pair"),
        }
    }
}

/// Keyring deriving accounts from a BIP-39 mnemonic.
///
/// Accounts are ordered by derivation index; the next index is always the
/// current account count, so indices are never reused.
#[derive(Clone)]
pub struct HdKeyring {
    mnemonic: Zeroizing<String>,
    signers: Vec<PrivateKeySigner>,
}

impl HdKeyring {
    /// Create a keyring from a phrase with no accounts derived yet.
    ///
    /// The phrase is validated and normalized first.
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let mnemonic = mnemonic::normalize_mnemonic(phrase)?;
        Ok(Self {
            mnemonic,
            signers: Vec::new(),
        })
    }

    /// Create a keyring and derive the first `count` accounts.
    pub fn restore(phrase: &str, count: u32) -> Result<Self> {
        let mut keyring = Self::from_mnemonic(phrase)?;
        for _ in 0..count {
            keyring.add_account()?;
        }
        Ok(keyring)
    }

    /// Derive the account at the next index.
    pub fn add_account(&mut self) -> Result<Address> {
        let index = u32::try_from(self.signers.len())
            .map_err(|_| KeyringError::UnsupportedOperation("derivation index exhausted".into()))?;
        let signer = derive_signer(&self.mnemonic, index)?;
        let address = signer.address();
        debug!(index, %address, "derived HD account");
        self.signers.push(signer);
        Ok(address)
    }

    /// The normalized mnemonic phrase. Handle with care.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Number of derived accounts (and the next derivation index).
    pub fn account_count(&self) -> u32 {
        // add_account refuses to grow past u32::MAX
        u32::try_from(self.signers.len()).unwrap_or(u32::MAX)
    }
}

impl fmt::Debug for HdKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdKeyring")
            .field("mnemonic", &"[REDACTED]")
            .field("accounts", &self.signers.len())
            .finish()
    }
}

/// Keyring holding imported private keys in insertion order.
#[derive(Clone, Default)]
pub struct SimpleKeyring {
    signers: Vec<PrivateKeySigner>,
}

impl SimpleKeyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyring from hex private keys, skipping duplicates.
    pub fn from_private_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self> {
        let mut keyring = Self::new();
        for key in keys {
            keyring.import(keys::parse_private_key(key.as_ref())?);
        }
        Ok(keyring)
    }

    /// Add a key. Returns the address and whether it was newly inserted.
    pub fn import(&mut self, signer: PrivateKeySigner) -> (Address, bool) {
        let address = signer.address();
        if self.signers.iter().any(|s| s.address() == address) {
            return (address, false);
        }
        self.signers.push(signer);
        (address, true)
    }
}

impl fmt::Debug for SimpleKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleKeyring")
            .field("accounts", &self.signers.len())
            .finish()
    }
}

/// A key source owned by the controller.
#[derive(Debug, Clone)]
pub enum Keyring {
    /// Mnemonic-backed keyring.
    Hd(HdKeyring),
    /// Imported-key keyring.
    Simple(SimpleKeyring),
}

impl Keyring {
    /// Variant tag.
    pub fn kind(&self) -> KeyringKind {
        match self {
            Self::Hd(_) => KeyringKind::Hd,
            Self::Simple(_) => KeyringKind::Simple,
        }
    }

    fn signers(&self) -> &[PrivateKeySigner] {
        match self {
            Self::Hd(k) => &k.signers,
            Self::Simple(k) => &k.signers,
        }
    }

    /// Accounts in derivation (HD) or insertion (simple) order.
    pub fn accounts(&self) -> Vec<Address> {
        self.signers().iter().map(PrivateKeySigner::address).collect()
    }

    /// Whether this keyring owns `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.signers().iter().any(|s| s.address() == *address)
    }

    /// The signer for an owned account.
    pub fn signer(&self, address: &Address) -> Option<&PrivateKeySigner> {
        self.signers().iter().find(|s| s.address() == *address)
    }

    /// Export the private key of an owned account as `0x` hex.
    pub fn export_account(&self, address: &Address) -> Result<Zeroizing<String>> {
        self.signer(address)
            .map(keys::private_key_hex)
            .ok_or(KeyringError::AccountNotFound(*address))
    }

    /// Sign a 32-byte digest with an owned account's key.
    pub fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        let signer = self
            .signer(address)
            .ok_or(KeyringError::AccountNotFound(*address))?;
        signer
            .sign_hash_sync(hash)
            .map_err(|e| KeyringError::Signing(e.to_string()))
    }

    /// Derive the next account. Simple keyrings cannot grow this way.
    pub fn add_account(&mut self) -> Result<Address> {
        match self {
            Self::Hd(k) => k.add_account(),
            Self::Simple(_) => Err(KeyringError::UnsupportedOperation(
                "simple keyrings hold imported keys only; use import".into(),
            )),
        }
    }

    /// Minimal reconstruction data for the vault.
    pub fn snapshot(&self) -> KeyringSnapshot {
        match self {
            Self::Hd(k) => KeyringSnapshot::Hd {
                mnemonic: k.mnemonic.to_string(),
                number_of_accounts: k.account_count(),
            },
            Self::Simple(k) => KeyringSnapshot::Simple {
                private_keys: k
                    .signers
                    .iter()
                    .map(|s| keys::private_key_hex(s).to_string())
                    .collect(),
            },
        }
    }

    /// Rebuild a keyring from its vault snapshot.
    pub fn from_snapshot(snapshot: &KeyringSnapshot) -> Result<Self> {
        match snapshot {
            KeyringSnapshot::Hd {
                mnemonic,
                number_of_accounts,
            } => Ok(Self::Hd(HdKeyring::restore(mnemonic, *number_of_accounts)?)),
            KeyringSnapshot::Simple { private_keys } => {
                Ok(Self::Simple(SimpleKeyring::from_private_keys(private_keys)?))
            }
        }
    }
}

/// Derive the signer at `index` on the default Ethereum path.
fn derive_signer(phrase: &str, index: u32) -> Result<PrivateKeySigner> {
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .index(index)
        .map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))?
        .build()
        .map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))
}

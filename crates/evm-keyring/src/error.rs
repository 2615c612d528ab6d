//! Keyring error types.

use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::provider::ProviderError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = KeyringError> = std::result::Result<T, E>;

/// Errors that can occur in keyring operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    /// The password does not decrypt the stored vault.
    #[error("invalid password")]
    WrongPassword,

    /// A vault could not be created (already exists, empty password, ...).
    #[error("vault creation: {0}")]
    VaultCreation(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Private key is malformed or outside the secp256k1 scalar range.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// No keyring owns the requested account.
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    /// No keyring exists at the requested position.
    #[error("keyring not found at index {0}")]
    KeyringNotFound(usize),

    /// The operation needs an unlocked vault.
    #[error("keyring is locked")]
    KeyringLocked,

    /// The keyring variant does not support the operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Transaction request is missing or has inconsistent fields.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// EIP-712 payload does not match its declared types.
    #[error("typed data schema: {0}")]
    TypedDataSchema(String),

    /// The chain provider reported a failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A chain provider call did not complete in time.
    #[error("provider call `{operation}` timed out after {timeout:?}")]
    ProviderTimeout {
        /// Provider operation that was cancelled.
        operation: &'static str,
        /// Configured deadline.
        timeout: Duration,
    },

    /// Persisting the encrypted vault failed; in-memory state was not changed.
    #[error("persistence: {0}")]
    Persistence(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Stored vault is corrupted or has an unsupported format.
    #[error("corrupted vault: {0}")]
    CorruptedVault(String),

    /// ECDSA signing failure.
    #[error("signing: {0}")]
    Signing(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),
}

//! # evm-keyring — encrypted keyring controller for EVM chains.
//!
//! Manages one encrypted vault holding HD (mnemonic) and imported-key
//! keyrings, and signs transactions, personal messages and EIP-712 typed
//! data for chains that differ in transaction type and fee shape.
//!
//! # Modules
//!
//! - [`error`] — `KeyringError` enum
//! - [`config`] — `ControllerConfig` defaults and builders
//! - [`chains`] — preset table of known networks
//! - [`mnemonic`] — BIP-39 generation and validation
//! - [`keys`] — private key parsing, export, signature encoding
//! - [`keyring`] — HD and simple keyrings
//! - [`vault`] — serializable vault contents
//! - [`encryption`] — `Encryptor` trait, argon2id + AES-256-GCM implementation
//! - [`store`] — `VaultStore` trait, memory and file stores
//! - [`signing`] — legacy and fee-market transaction strategies
//! - [`typed_data`] — EIP-712 hashing and signing
//! - [`personal`] — personal message signing
//! - [`provider`] — `ChainProvider` trait consumed for chain data
//! - [`fees`] — fee tier normalization
//! - [`controller`] — `KeyringController` façade

pub mod chains;
pub mod config;
pub mod controller;
pub mod encryption;
pub mod error;
pub mod fees;
pub mod keyring;
pub mod keys;
pub mod mnemonic;
pub mod personal;
pub mod provider;
pub mod signing;
pub mod store;
pub mod typed_data;
pub mod vault;

#[cfg(test)]
mod test_vectors;

// Re-exports for convenient access
pub use chains::{CHAIN_PRESETS, ChainPreset};
pub use config::ControllerConfig;
pub use controller::{KeySource, KeyringController};
pub use encryption::{Encryptor, PasswordEncryptor};
pub use error::{KeyringError, Result};
pub use fees::{FeeEstimate, FeePolicy, FeeTier, Fees};
pub use keyring::{HdKeyring, Keyring, KeyringKind, SimpleKeyring};
pub use provider::{ChainProvider, FeeData, PriorityFeeSuggestions, ProviderError};
pub use signing::{RawTransactionRequest, SignedTransaction, TxType};
pub use store::{FileVaultStore, MemoryVaultStore, VaultStore};
pub use typed_data::{TypedDataPayload, TypedField};
pub use vault::{KeyringSnapshot, Vault};

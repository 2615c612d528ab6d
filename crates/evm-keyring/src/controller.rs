//! The keyring controller: vault lifecycle plus every signing entry point.
//!
//! State is `Locked` or `Unlocked`. Unlocking decrypts the stored blob and
//! rebuilds the keyrings; locking drops them together with the cached
//! password. Every mutation runs under a single mutex: it is applied to a
//! candidate copy of the keyrings, the candidate is encrypted and saved,
//! and only then does it replace the live set. A failed save therefore
//! leaves both memory and storage as they were.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Signature, U256};
use parking_lot::Mutex;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::ControllerConfig;
use crate::encryption::Encryptor;
use crate::error::{KeyringError, Result};
use crate::fees::{self, FeeEstimate};
use crate::keyring::{HdKeyring, Keyring, KeyringKind, SimpleKeyring};
use crate::keys;
use crate::mnemonic;
use crate::personal;
use crate::provider::{ChainProvider, with_timeout};
use crate::signing::{self, RawTransactionRequest, SignedTransaction, TxType};
use crate::store::VaultStore;
use crate::typed_data::{self, TypedDataPayload};
use crate::vault::Vault;

/// Where a transaction's signing key comes from.
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// A raw hex private key; no vault needed.
    PrivateKey(&'a str),
    /// An account owned by one of the unlocked keyrings.
    Account(Address),
}

impl std::fmt::Debug for KeySource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivateKey(_) => f.write_str("PrivateKey([REDACTED])"),
            Self::Account(address) => f.debug_tuple("Account").field(address).finish(),
        }
    }
}

impl From<Address> for KeySource<'_> {
    fn from(address: Address) -> Self {
        Self::Account(address)
    }
}

#[derive(Default)]
struct ControllerState {
    keyrings: Vec<Keyring>,
    /// Present exactly while unlocked.
    password: Option<Zeroizing<String>>,
}

impl ControllerState {
    fn unlocked(&self) -> Result<&str> {
        self.password
            .as_deref()
            .map(String::as_str)
            .ok_or(KeyringError::KeyringLocked)
    }

    fn accounts(&self) -> Vec<Address> {
        self.keyrings.iter().flat_map(Keyring::accounts).collect()
    }

    fn keyring_for(&self, address: &Address) -> Result<&Keyring> {
        self.unlocked()?;
        self.keyrings
            .iter()
            .find(|k| k.contains(address))
            .ok_or(KeyringError::AccountNotFound(*address))
    }

    fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        self.keyring_for(address)?.sign_hash(address, hash)
    }
}

/// Façade over the encrypted vault and its keyrings.
pub struct KeyringController {
    encryptor: Arc<dyn Encryptor>,
    store: Arc<dyn VaultStore>,
    config: ControllerConfig,
    state: Mutex<ControllerState>,
}

impl KeyringController {
    /// A locked controller over `store`.
    pub fn new(encryptor: Arc<dyn Encryptor>, store: Arc<dyn VaultStore>, config: ControllerConfig) -> Self {
        Self {
            encryptor,
            store,
            config,
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Default transaction type for requests without `type`.
    pub fn tx_type(&self) -> TxType {
        self.config.default_tx_type
    }

    /// Whether the keyrings are loaded.
    pub fn is_unlocked(&self) -> bool {
        self.state.lock().password.is_some()
    }

    /// Whether the store holds a vault blob.
    pub fn has_vault(&self) -> Result<bool> {
        Ok(self.store.load()?.is_some())
    }

    /// Number of loaded keyrings (zero while locked).
    pub fn keyring_count(&self) -> usize {
        self.state.lock().keyrings.len()
    }

    /// Variant of each loaded keyring, in registration order.
    pub fn keyring_kinds(&self) -> Vec<KeyringKind> {
        self.state.lock().keyrings.iter().map(Keyring::kind).collect()
    }

    /// Encrypt and save `keyrings`, then make them the live set.
    fn commit(&self, state: &mut ControllerState, password: Zeroizing<String>, keyrings: Vec<Keyring>) -> Result<()> {
        let vault = Vault::from_keyrings(&keyrings);
        let blob = self.encryptor.encrypt(&password, &vault)?;
        self.store.save(&blob).map_err(|e| match e {
            KeyringError::Persistence(_) => e,
            other => KeyringError::Persistence(other.to_string()),
        })?;
        debug!(keyrings = keyrings.len(), "vault persisted");
        state.keyrings = keyrings;
        state.password = Some(password);
        Ok(())
    }

    fn check_new_password(password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(KeyringError::VaultCreation("password must not be empty".into()));
        }
        Ok(())
    }

    /// Create a vault with one fresh HD keyring, refusing to replace an
    /// existing vault.
    pub fn create_new_vault_and_keychain(&self, password: &str) -> Result<Vec<Address>> {
        self.create_new_vault_and_keychain_with(password, false)
    }

    /// Create a vault with one fresh HD keyring holding one account.
    ///
    /// With `overwrite == false` an existing vault is a `VaultCreation` error.
    pub fn create_new_vault_and_keychain_with(&self, password: &str, overwrite: bool) -> Result<Vec<Address>> {
        Self::check_new_password(password)?;
        let mut state = self.state.lock();
        if !overwrite && self.store.load()?.is_some() {
            return Err(KeyringError::VaultCreation("vault already exists".into()));
        }

        let phrase = mnemonic::generate_mnemonic(self.config.mnemonic_word_count)?;
        let keyring = HdKeyring::restore(&phrase, 1)?;
        self.commit(&mut state, Zeroizing::new(password.to_string()), vec![Keyring::Hd(keyring)])?;

        let accounts = state.accounts();
        info!(accounts = accounts.len(), "vault created");
        Ok(accounts)
    }

    /// Replace any existing vault with one HD keyring restored from
    /// `phrase`, deriving the account at index 0.
    pub fn create_new_vault_and_restore(&self, password: &str, phrase: &str) -> Result<Vec<Address>> {
        Self::check_new_password(password)?;
        let keyring = HdKeyring::restore(phrase, 1)?;
        let mut state = self.state.lock();
        self.commit(&mut state, Zeroizing::new(password.to_string()), vec![Keyring::Hd(keyring)])?;

        let accounts = state.accounts();
        info!(accounts = accounts.len(), "vault restored from mnemonic");
        Ok(accounts)
    }

    /// Decrypt the stored vault and load its keyrings.
    pub fn unlock(&self, password: &str) -> Result<Vec<Address>> {
        // Lock before loading so the blob read is the last committed one.
        let mut state = self.state.lock();
        let blob = self
            .store
            .load()?
            .ok_or_else(|| KeyringError::CorruptedVault("no vault to unlock".into()))?;
        let vault = self.encryptor.decrypt(password, &blob)?;
        let keyrings = vault.to_keyrings()?;

        state.keyrings = keyrings;
        state.password = Some(Zeroizing::new(password.to_string()));
        let accounts = state.accounts();
        info!(keyrings = state.keyrings.len(), accounts = accounts.len(), "vault unlocked");
        Ok(accounts)
    }

    /// Drop the keyrings and the cached password.
    pub fn lock(&self) {
        let mut state = self.state.lock();
        state.keyrings.clear();
        state.password = None;
        info!("vault locked");
    }

    /// Check `password` against the stored vault without changing state.
    pub fn verify_password(&self, password: &str) -> Result<()> {
        let blob = self
            .store
            .load()?
            .ok_or_else(|| KeyringError::CorruptedVault("no vault to verify".into()))?;
        self.encryptor.decrypt(password, &blob).map(drop)
    }

    /// Derive the next account on the keyring at `keyring_index`.
    pub fn add_new_account(&self, keyring_index: usize) -> Result<Address> {
        let mut state = self.state.lock();
        let password = Zeroizing::new(state.unlocked()?.to_string());

        let mut candidate = state.keyrings.clone();
        let address = candidate
            .get_mut(keyring_index)
            .ok_or(KeyringError::KeyringNotFound(keyring_index))?
            .add_account()?;
        self.commit(&mut state, password, candidate)?;

        info!(keyring = keyring_index, %address, "account added");
        Ok(address)
    }

    /// Import a raw private key into the simple keyring, creating it when
    /// absent. Importing an already-owned key returns its address unchanged.
    pub fn import_wallet(&self, private_key: &str) -> Result<Address> {
        let signer = keys::parse_private_key(private_key)?;
        let address = signer.address();

        let mut state = self.state.lock();
        let password = Zeroizing::new(state.unlocked()?.to_string());
        if state.keyrings.iter().any(|k| k.contains(&address)) {
            debug!(%address, "import of owned account ignored");
            return Ok(address);
        }

        let mut candidate = state.keyrings.clone();
        match candidate.iter_mut().find_map(|k| match k {
            Keyring::Simple(simple) => Some(simple),
            Keyring::Hd(_) => None,
        }) {
            Some(simple) => {
                simple.import(signer);
            }
            None => {
                let mut simple = SimpleKeyring::new();
                simple.import(signer);
                candidate.push(Keyring::Simple(simple));
            }
        }
        self.commit(&mut state, password, candidate)?;

        info!(%address, "account imported");
        Ok(address)
    }

    /// Private key of an owned account as `0x` hex.
    pub fn export_account(&self, address: Address) -> Result<Zeroizing<String>> {
        self.state.lock().keyring_for(&address)?.export_account(&address)
    }

    /// All accounts: keyrings in registration order, then account order.
    pub fn get_accounts(&self) -> Result<Vec<Address>> {
        let state = self.state.lock();
        state.unlocked()?;
        Ok(state.accounts())
    }

    /// Mnemonic of the first HD keyring, for backup display.
    pub fn get_mnemonic(&self) -> Result<Zeroizing<String>> {
        let state = self.state.lock();
        state.unlocked()?;
        state
            .keyrings
            .iter()
            .find_map(|k| match k {
                Keyring::Hd(hd) => Some(Zeroizing::new(hd.mnemonic().to_string())),
                Keyring::Simple(_) => None,
            })
            .ok_or_else(|| KeyringError::UnsupportedOperation("vault has no HD keyring".into()))
    }

    /// Sign a transaction with the configured default type.
    pub fn sign_transaction(&self, tx: &RawTransactionRequest, source: KeySource<'_>) -> Result<SignedTransaction> {
        let default_type = self.config.default_tx_type;
        match source {
            KeySource::PrivateKey(key) => {
                let signer = keys::parse_private_key(key)?;
                signing::sign_transaction(tx, default_type, &signer)
            }
            KeySource::Account(address) => {
                let state = self.state.lock();
                signing::sign_transaction_with(tx, default_type, address, |hash| {
                    state.sign_hash(&address, hash)
                })
            }
        }
    }

    /// EIP-712 sign with an owned account.
    pub fn sign_typed_message(&self, from: Address, payload: &TypedDataPayload) -> Result<String> {
        let hash = payload.signing_hash()?;
        let signature = self.state.lock().sign_hash(&from, &hash)?;
        Ok(keys::signature_to_hex(&signature))
    }

    /// EIP-712 sign with a raw private key.
    pub fn custom_sign_typed_message(&self, private_key: &str, payload: &TypedDataPayload) -> Result<String> {
        typed_data::custom_sign_typed_message(private_key, payload)
    }

    /// Personal-sign with an owned account.
    pub fn sign_personal_message(&self, from: Address, message: &[u8]) -> Result<String> {
        let hash = personal::personal_message_hash(message);
        let signature = self.state.lock().sign_hash(&from, &hash)?;
        Ok(keys::signature_to_hex(&signature))
    }

    /// Personal-sign with a raw private key.
    pub fn custom_personal_sign(&self, private_key: &str, message: &[u8]) -> Result<String> {
        personal::custom_personal_sign(private_key, message)
    }

    /// Fee tiers for `tx` on the provider's chain.
    pub async fn get_fees(&self, tx: &RawTransactionRequest, provider: &dyn ChainProvider) -> Result<FeeEstimate> {
        fees::estimate_fees(
            tx,
            self.config.default_tx_type,
            provider,
            &self.config.fee_policy,
            self.config.provider_timeout,
        )
        .await
    }

    /// Native balance of `address`.
    pub async fn get_balance(&self, address: Address, provider: &dyn ChainProvider) -> Result<U256> {
        with_timeout("balance", self.config.provider_timeout, provider.balance(address)).await
    }

    /// Next nonce for `address`.
    pub async fn next_nonce(&self, address: Address, provider: &dyn ChainProvider) -> Result<u64> {
        with_timeout(
            "transaction_count",
            self.config.provider_timeout,
            provider.transaction_count(address),
        )
        .await
    }
}

impl std::fmt::Debug for KeyringController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("KeyringController")
            .field("unlocked", &state.password.is_some())
            .field("keyrings", &state.keyrings)
            .field("config", &self.config)
            .finish()
    }
}

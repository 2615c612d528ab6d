//! Shared fixtures for the integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use evm_keyring::provider::{ChainProvider, FeeData, PriorityFeeSuggestions, ProviderError};
use evm_keyring::signing::RawTransactionRequest;
use evm_keyring::store::{MemoryVaultStore, VaultStore};
use evm_keyring::{ControllerConfig, KeyringController, PasswordEncryptor};
use parking_lot::Mutex;

/// Password used by every fixture vault.
pub const PASSWORD: &str = "random_password";

/// Well-known 12-word development mnemonic.
pub const HD_WALLET_12_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// First three accounts of [`HD_WALLET_12_MNEMONIC`].
pub const HD_ACCOUNTS: [&str; 3] = [
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
];

/// Private key of `HD_ACCOUNTS[0]`.
pub const HD_ACCOUNT_0_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Key of an account outside the mnemonic.
pub const EXTERNAL_ACCOUNT_PRIVATE_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Address of [`EXTERNAL_ACCOUNT_PRIVATE_KEY`].
pub const EXTERNAL_ACCOUNT_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

/// Recipient used in transfer fixtures.
pub const RECEIVER_ADDRESS: &str = "0xca878f65d50caf80a84fb24e40f56ef05483e1cb";

/// One gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Parse a hex address, panicking on bad fixtures.
pub fn addr(s: &str) -> Address {
    s.parse().expect("fixture address")
}

/// Encryptor with minimal argon2 cost.
pub fn fast_encryptor() -> Arc<PasswordEncryptor> {
    Arc::new(PasswordEncryptor::with_params(8, 1, 1).expect("argon2 params"))
}

/// Controller over a fresh in-memory store.
pub fn memory_controller(config: ControllerConfig) -> (KeyringController, Arc<MemoryVaultStore>) {
    let store = Arc::new(MemoryVaultStore::new());
    let controller = KeyringController::new(fast_encryptor(), store.clone(), config);
    (controller, store)
}

/// Controller over an existing store.
pub fn controller_over(store: Arc<dyn VaultStore>, config: ControllerConfig) -> KeyringController {
    KeyringController::new(fast_encryptor(), store, config)
}

/// Fee data shaped like a fee-market chain.
pub fn fee_market_data(base_fee_gwei: u128) -> FeeData {
    FeeData {
        base_fee_per_gas: Some(base_fee_gwei * GWEI),
        gas_price: (base_fee_gwei + 2) * GWEI,
        suggested_priority_fees: PriorityFeeSuggestions {
            slow: GWEI,
            standard: 2 * GWEI,
            fast: 3 * GWEI,
        },
    }
}

/// Fee data shaped like a legacy chain: gas price only.
pub fn legacy_data(gas_price_gwei: u128) -> FeeData {
    FeeData {
        base_fee_per_gas: None,
        gas_price: gas_price_gwei * GWEI,
        suggested_priority_fees: PriorityFeeSuggestions::default(),
    }
}

/// In-memory chain provider with call counting.
pub struct MockProvider {
    fee_data: FeeData,
    gas_estimate: u64,
    nonces: Mutex<HashMap<Address, u64>>,
    balances: Mutex<HashMap<Address, U256>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Provider reporting `fee_data` and a 21 000 gas estimate.
    pub fn new(fee_data: FeeData) -> Self {
        Self {
            fee_data,
            gas_estimate: 21_000,
            nonces: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the gas estimate.
    pub fn with_gas_estimate(mut self, gas: u64) -> Self {
        self.gas_estimate = gas;
        self
    }

    /// Record a nonce for `address`.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.lock().insert(address, nonce);
    }

    /// Record a balance for `address`.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.lock().insert(address, balance);
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        self.hit();
        Ok(self.fee_data)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ProviderError> {
        self.hit();
        Ok(self.nonces.lock().get(&address).copied().unwrap_or(0))
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.hit();
        Ok(self.balances.lock().get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn estimate_gas(&self, _tx: &RawTransactionRequest) -> Result<u64, ProviderError> {
        self.hit();
        Ok(self.gas_estimate)
    }
}

/// Provider whose every call fails.
pub struct UnreachableProvider;

#[async_trait]
impl ChainProvider for UnreachableProvider {
    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        Err(ProviderError::new("unreachable"))
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, ProviderError> {
        Err(ProviderError::new("unreachable"))
    }

    async fn balance(&self, _address: Address) -> Result<U256, ProviderError> {
        Err(ProviderError::new("unreachable"))
    }

    async fn estimate_gas(&self, _tx: &RawTransactionRequest) -> Result<u64, ProviderError> {
        Err(ProviderError::new("unreachable"))
    }
}

/// Provider that never answers.
pub struct HangingProvider;

#[async_trait]
impl ChainProvider for HangingProvider {
    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        std::future::pending().await
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, ProviderError> {
        std::future::pending().await
    }

    async fn balance(&self, _address: Address) -> Result<U256, ProviderError> {
        std::future::pending().await
    }

    async fn estimate_gas(&self, _tx: &RawTransactionRequest) -> Result<u64, ProviderError> {
        std::future::pending().await
    }
}

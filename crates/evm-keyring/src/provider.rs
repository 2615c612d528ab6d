//! Chain access consumed by the controller.
//!
//! The keyring never talks to a node directly. Fee data, nonces, balances
//! and gas estimates come through [`ChainProvider`], implemented by the host
//! (a JSON-RPC client in production, an in-memory mock in tests).

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{KeyringError, Result};
use crate::signing::RawTransactionRequest;

/// Failure reported by a chain provider (transport, RPC error, bad reply).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("provider: {message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    /// Wrap a provider failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The underlying failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Priority fee suggestions at three urgency levels, in wei per gas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityFeeSuggestions {
    /// Low-percentile tip.
    pub slow: u128,
    /// Median tip.
    pub standard: u128,
    /// High-percentile tip.
    pub fast: u128,
}

/// Raw fee primitives reported by a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    /// Latest block base fee; `None` on chains without a fee market.
    pub base_fee_per_gas: Option<u128>,
    /// Node-suggested legacy gas price.
    pub gas_price: u128,
    /// Suggested priority fees.
    pub suggested_priority_fees: PriorityFeeSuggestions,
}

/// Read access to an EVM chain.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Current fee data.
    async fn fee_data(&self) -> Result<FeeData, ProviderError>;

    /// Number of transactions sent from `address` (its next nonce).
    async fn transaction_count(&self, address: Address) -> Result<u64, ProviderError>;

    /// Native balance of `address` in wei.
    async fn balance(&self, address: Address) -> Result<U256, ProviderError>;

    /// Gas the node expects the request to consume.
    async fn estimate_gas(&self, tx: &RawTransactionRequest) -> Result<u64, ProviderError>;
}

/// Run a provider call under a deadline.
///
/// Expiry maps to [`KeyringError::ProviderTimeout`], provider failures to
/// [`KeyringError::Provider`]. Nothing is retried.
pub async fn with_timeout<T, F>(operation: &'static str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(KeyringError::from),
        Err(_) => Err(KeyringError::ProviderTimeout { operation, timeout }),
    }
}

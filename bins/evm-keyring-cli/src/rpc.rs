//! JSON-RPC backed [`ChainProvider`].

use alloy::eips::BlockNumberOrTag;
use alloy::network::Ethereum;
use alloy::primitives::{Address, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use evm_keyring::provider::{ChainProvider, FeeData, PriorityFeeSuggestions, ProviderError};
use evm_keyring::signing::RawTransactionRequest;
use tracing::debug;

/// Blocks sampled for priority fee suggestions.
const FEE_HISTORY_BLOCKS: u64 = 5;

/// Reward percentiles mapped to the slow, standard and fast tips.
const REWARD_PERCENTILES: [f64; 3] = [10.0, 50.0, 90.0];

/// Chain access over an HTTP endpoint.
pub struct RpcChainProvider {
    provider: DynProvider<Ethereum>,
    url: String,
}

impl RpcChainProvider {
    /// Connect to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .connect(url)
            .await
            .with_context(|| format!("failed to connect to '{url}'"))?
            .erased();
        Ok(Self {
            provider,
            url: url.to_string(),
        })
    }

    /// Average each percentile column over the sampled blocks.
    async fn priority_fees(&self) -> Result<PriorityFeeSuggestions, ProviderError> {
        let history = self
            .provider
            .get_fee_history(FEE_HISTORY_BLOCKS, BlockNumberOrTag::Latest, &REWARD_PERCENTILES)
            .await
            .map_err(rpc_err)?;
        let rewards = history.reward.unwrap_or_default();
        let column = |i: usize| {
            let samples: Vec<u128> = rewards.iter().filter_map(|row| row.get(i).copied()).collect();
            if samples.is_empty() {
                0
            } else {
                samples.iter().sum::<u128>() / samples.len() as u128
            }
        };
        Ok(PriorityFeeSuggestions {
            slow: column(0),
            standard: column(1),
            fast: column(2),
        })
    }
}

fn rpc_err(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::new(e.to_string())
}

fn to_rpc_request(tx: &RawTransactionRequest) -> TransactionRequest {
    TransactionRequest {
        from: tx.from,
        to: Some(tx.to.map_or(TxKind::Create, TxKind::Call)),
        value: Some(tx.value),
        input: TransactionInput::new(tx.data.clone()),
        chain_id: Some(tx.chain_id),
        ..Default::default()
    }
}

#[async_trait]
impl ChainProvider for RpcChainProvider {
    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        let gas_price = self.provider.get_gas_price().await.map_err(rpc_err)?;
        let latest = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(rpc_err)?;
        let base_fee_per_gas = latest
            .and_then(|block| block.header.base_fee_per_gas)
            .map(u128::from);

        let suggested_priority_fees = match base_fee_per_gas {
            Some(_) => self.priority_fees().await?,
            None => PriorityFeeSuggestions::default(),
        };
        debug!(url = %self.url, ?base_fee_per_gas, gas_price, "fetched fee data");

        Ok(FeeData {
            base_fee_per_gas,
            gas_price,
            suggested_priority_fees,
        })
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ProviderError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(rpc_err)
    }

    async fn balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.provider.get_balance(address).await.map_err(rpc_err)
    }

    async fn estimate_gas(&self, tx: &RawTransactionRequest) -> Result<u64, ProviderError> {
        self.provider
            .estimate_gas(to_rpc_request(tx))
            .await
            .map_err(rpc_err)
    }
}

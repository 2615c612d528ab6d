//! Fee estimation normalized to a fixed `{slow, standard, fast, baseFee}` shape.
//!
//! Chains expose different raw primitives: fee-market chains report a base
//! fee plus priority suggestions, legacy chains a single gas price. Both are
//! mapped onto three [`FeeTier`]s using the multipliers in [`FeePolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::provider::{ChainProvider, FeeData, PriorityFeeSuggestions, with_timeout};
use crate::signing::{RawTransactionRequest, TxType};

/// Denominator for basis-point multipliers.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Multipliers in basis points (10 000 = 100 %) for the three tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMultipliers {
    /// Slow tier.
    pub slow: u32,
    /// Standard tier.
    pub standard: u32,
    /// Fast tier.
    pub fast: u32,
}

impl TierMultipliers {
    fn as_array(self) -> [u32; 3] {
        [self.slow, self.standard, self.fast]
    }
}

/// Tier multipliers applied to the chain's raw fee data.
///
/// Defaults: base fee × 110 / 125 / 150 % on fee-market chains (plus the
/// tier's priority fee), gas price × 100 / 110 / 125 % on legacy chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicy {
    /// Applied to the base fee.
    pub base_fee: TierMultipliers,
    /// Applied to the legacy gas price.
    pub gas_price: TierMultipliers,
}

impl FeePolicy {
    /// Default base-fee multipliers.
    pub const DEFAULT_BASE_FEE: TierMultipliers = TierMultipliers {
        slow: 11_000,
        standard: 12_500,
        fast: 15_000,
    };

    /// Default gas-price multipliers.
    pub const DEFAULT_GAS_PRICE: TierMultipliers = TierMultipliers {
        slow: 10_000,
        standard: 11_000,
        fast: 12_500,
    };
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            base_fee: Self::DEFAULT_BASE_FEE,
            gas_price: Self::DEFAULT_GAS_PRICE,
        }
    }
}

/// One fee tier, in wei per gas.
///
/// On legacy chains `max_fee_per_gas` is the gas price to use and the
/// priority fee is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    /// Fee cap (or legacy gas price).
    pub max_fee_per_gas: u128,
    /// Tip.
    pub max_priority_fee_per_gas: u128,
}

/// The four-key fee quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    /// Cheapest tier.
    pub slow: FeeTier,
    /// Middle tier.
    pub standard: FeeTier,
    /// Most aggressive tier.
    pub fast: FeeTier,
    /// Base fee (fee-market) or node gas price (legacy).
    #[serde(rename = "baseFee")]
    pub base_fee: u128,
}

/// Fee quote plus the gas limit it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    /// Request's gas limit, or the provider's estimate.
    pub gas_limit: u64,
    /// Shape the tiers were computed in.
    pub tx_type: TxType,
    /// The tiers.
    pub fees: Fees,
}

fn scale(value: u128, bps: u32) -> u128 {
    value.saturating_mul(u128::from(bps)) / BPS_DENOMINATOR
}

/// Tiers for a fee-market chain.
pub fn fee_market_fees(base_fee: u128, priority: PriorityFeeSuggestions, policy: &FeePolicy) -> Fees {
    let mut tips = [priority.slow, priority.standard, priority.fast];
    tips.sort_unstable();
    let tier = |i: usize| FeeTier {
        max_fee_per_gas: scale(base_fee, policy.base_fee.as_array()[i]).saturating_add(tips[i]),
        max_priority_fee_per_gas: tips[i],
    };
    Fees {
        slow: tier(0),
        standard: tier(1),
        fast: tier(2),
        base_fee,
    }
}

/// Tiers for a legacy gas-price chain.
pub fn legacy_fees(gas_price: u128, policy: &FeePolicy) -> Fees {
    let tier = |i: usize| FeeTier {
        max_fee_per_gas: scale(gas_price, policy.gas_price.as_array()[i]),
        max_priority_fee_per_gas: 0,
    };
    Fees {
        slow: tier(0),
        standard: tier(1),
        fast: tier(2),
        base_fee: gas_price,
    }
}

/// Normalize raw fee data for the requested transaction type.
///
/// A fee-market request against a chain with no base fee falls back to the
/// legacy shape; the returned type says which shape was used.
pub fn normalize_fees(fee_data: &FeeData, requested: TxType, policy: &FeePolicy) -> (TxType, Fees) {
    match (requested, fee_data.base_fee_per_gas) {
        (TxType::FeeMarket, Some(base_fee)) => (
            TxType::FeeMarket,
            fee_market_fees(base_fee, fee_data.suggested_priority_fees, policy),
        ),
        (TxType::FeeMarket, None) => {
            warn!("provider reported no base fee, falling back to legacy fee shape");
            (TxType::Legacy, legacy_fees(fee_data.gas_price, policy))
        }
        (TxType::Legacy, _) => (TxType::Legacy, legacy_fees(fee_data.gas_price, policy)),
    }
}

/// Query the provider and build a [`FeeEstimate`] for `tx`.
///
/// Every provider call is bounded by `timeout`. Nothing is retried.
pub async fn estimate_fees(
    tx: &RawTransactionRequest,
    default_type: TxType,
    provider: &dyn ChainProvider,
    policy: &FeePolicy,
    timeout: Duration,
) -> Result<FeeEstimate> {
    let fee_data = with_timeout("fee_data", timeout, provider.fee_data()).await?;
    let gas_limit = match tx.gas_limit {
        Some(limit) => limit,
        None => with_timeout("estimate_gas", timeout, provider.estimate_gas(tx)).await?,
    };
    let (tx_type, fees) = normalize_fees(&fee_data, tx.resolved_type(default_type), policy);
    info!(
        chain_id = tx.chain_id,
        %tx_type,
        gas_limit,
        base_fee = fees.base_fee,
        "fee estimate produced"
    );
    Ok(FeeEstimate {
        gas_limit,
        tx_type,
        fees,
    })
}

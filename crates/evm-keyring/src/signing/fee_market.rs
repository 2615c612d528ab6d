//! Type-2 (EIP-1559) transactions.
//!
//! Preimage: `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas,
//! maxFeePerGas, gasLimit, to, value, data, accessList])`.
//! Signed: the same list followed by `[yParity, r, s]`.

use alloy::primitives::Signature;

use super::rlp::{encode_list, tx_kind};
use super::{RawTransactionRequest, SigningStrategy, TxType};
use crate::error::{KeyringError, Result};

/// EIP-2718 type byte.
const TYPE_BYTE: u8 = 0x02;

/// EIP-1559 fee-market signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeMarketStrategy;

impl FeeMarketStrategy {
    /// `(max_priority_fee_per_gas, max_fee_per_gas)`.
    fn fee_caps(tx: &RawTransactionRequest) -> Result<(u128, u128)> {
        match (tx.max_priority_fee_per_gas, tx.max_fee_per_gas) {
            (Some(priority), Some(max)) => Ok((priority, max)),
            _ => Err(KeyringError::MalformedTransaction(
                "fee-market transaction needs maxFeePerGas and maxPriorityFeePerGas".into(),
            )),
        }
    }
}

impl SigningStrategy for FeeMarketStrategy {
    fn tx_type(&self) -> TxType {
        TxType::FeeMarket
    }

    fn validate(&self, tx: &RawTransactionRequest) -> Result<()> {
        tx.require_chain_id()?;
        tx.require_nonce()?;
        let (priority, max) = Self::fee_caps(tx)?;
        if tx.gas_price.is_some() {
            return Err(KeyringError::MalformedTransaction(
                "fee-market transaction must not carry gasPrice".into(),
            ));
        }
        if priority > max {
            return Err(KeyringError::MalformedTransaction(format!(
                "maxPriorityFeePerGas {priority} exceeds maxFeePerGas {max}"
            )));
        }
        Ok(())
    }

    fn signing_preimage(&self, tx: &RawTransactionRequest) -> Result<Vec<u8>> {
        let nonce = tx.require_nonce()?;
        let (priority, max) = Self::fee_caps(tx)?;
        let gas_limit = tx.effective_gas_limit();
        let to = tx_kind(tx.to);
        Ok(encode_list(
            Some(TYPE_BYTE),
            &[
                &tx.chain_id,
                &nonce,
                &priority,
                &max,
                &gas_limit,
                &to,
                &tx.value,
                &tx.data,
                &tx.access_list,
            ],
        ))
    }

    fn encode_v(&self, _chain_id: u64, y_parity: bool) -> Result<u64> {
        Ok(u64::from(y_parity))
    }

    fn encode_signed(&self, tx: &RawTransactionRequest, signature: &Signature) -> Result<Vec<u8>> {
        let nonce = tx.require_nonce()?;
        let (priority, max) = Self::fee_caps(tx)?;
        let gas_limit = tx.effective_gas_limit();
        let to = tx_kind(tx.to);
        let y_parity = signature.v();
        let r = signature.r();
        let s = signature.s();
        Ok(encode_list(
            Some(TYPE_BYTE),
            &[
                &tx.chain_id,
                &nonce,
                &priority,
                &max,
                &gas_limit,
                &to,
                &tx.value,
                &tx.data,
                &tx.access_list,
                &y_parity,
                &r,
                &s,
            ],
        ))
    }
}

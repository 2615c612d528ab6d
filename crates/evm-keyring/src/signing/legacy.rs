//! Type-0 transactions with EIP-155 replay protection.
//!
//! Preimage: `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])`.
//! Signed: `rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])` with
//! `v = recid + 35 + 2 * chainId`.

use alloy::primitives::Signature;

use super::rlp::{encode_list, tx_kind};
use super::{RawTransactionRequest, SigningStrategy, TxType};
use crate::error::{KeyringError, Result};

/// Largest chain id whose `v` still fits a `u64`.
pub const MAX_LEGACY_CHAIN_ID: u64 = (u64::MAX - 36) / 2;

/// Legacy gas-price signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyStrategy;

impl LegacyStrategy {
    fn gas_price(tx: &RawTransactionRequest) -> Result<u128> {
        tx.gas_price
            .ok_or_else(|| KeyringError::MalformedTransaction("legacy transaction needs gasPrice".into()))
    }
}

impl SigningStrategy for LegacyStrategy {
    fn tx_type(&self) -> TxType {
        TxType::Legacy
    }

    fn validate(&self, tx: &RawTransactionRequest) -> Result<()> {
        let chain_id = tx.require_chain_id()?;
        if chain_id > MAX_LEGACY_CHAIN_ID {
            return Err(KeyringError::MalformedTransaction(format!(
                "chain id {chain_id} too large for a legacy transaction (max {MAX_LEGACY_CHAIN_ID})"
            )));
        }
        tx.require_nonce()?;
        Self::gas_price(tx)?;
        if tx.max_fee_per_gas.is_some() || tx.max_priority_fee_per_gas.is_some() {
            return Err(KeyringError::MalformedTransaction(
                "legacy transaction must not carry maxFeePerGas or maxPriorityFeePerGas".into(),
            ));
        }
        if !tx.access_list.0.is_empty() {
            return Err(KeyringError::MalformedTransaction(
                "legacy transaction cannot carry an access list".into(),
            ));
        }
        Ok(())
    }

    fn signing_preimage(&self, tx: &RawTransactionRequest) -> Result<Vec<u8>> {
        let nonce = tx.require_nonce()?;
        let gas_price = Self::gas_price(tx)?;
        let gas_limit = tx.effective_gas_limit();
        let to = tx_kind(tx.to);
        Ok(encode_list(
            None,
            &[
                &nonce,
                &gas_price,
                &gas_limit,
                &to,
                &tx.value,
                &tx.data,
                &tx.chain_id,
                &0u8,
                &0u8,
            ],
        ))
    }

    fn encode_v(&self, chain_id: u64, y_parity: bool) -> Result<u64> {
        chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(y_parity)))
            .ok_or_else(|| KeyringError::MalformedTransaction(format!("chain id {chain_id} overflows v")))
    }

    fn encode_signed(&self, tx: &RawTransactionRequest, signature: &Signature) -> Result<Vec<u8>> {
        let nonce = tx.require_nonce()?;
        let gas_price = Self::gas_price(tx)?;
        let gas_limit = tx.effective_gas_limit();
        let to = tx_kind(tx.to);
        let v = self.encode_v(tx.chain_id, signature.v())?;
        let r = signature.r();
        let s = signature.s();
        Ok(encode_list(
            None,
            &[
                &nonce,
                &gas_price,
                &gas_limit,
                &to,
                &tx.value,
                &tx.data,
                &v,
                &r,
                &s,
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_private_key;
    use crate::signing::sign_transaction;
    use crate::test_vectors::HARDHAT_KEY_1;
    use alloy::consensus::{SignableTransaction, TxLegacy};
    use alloy::primitives::{Address, U256, keccak256};

    fn eip155_example() -> RawTransactionRequest {
        RawTransactionRequest::new(1)
            .with_nonce(9)
            .with_gas_price(20_000_000_000)
            .with_gas_limit(21_000)
            .with_to(Address::repeat_byte(0x35))
            .with_value(U256::from(1_000_000_000_000_000_000u64))
    }

    #[test]
    fn eip155_preimage() {
        let preimage = LegacyStrategy.signing_preimage(&eip155_example()).unwrap();
        assert_eq!(
            hex::encode(&preimage),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(keccak256(&preimage)),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn eip155_signed_vector() {
        let signer = parse_private_key(&format!("0x{}", "46".repeat(32))).unwrap();
        let signed = sign_transaction(&eip155_example(), TxType::Legacy, &signer).unwrap();
        assert_eq!(signed.v, 37);
        assert_eq!(
            signed.raw_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn preimage_matches_consensus_encoding() {
        let tx = eip155_example().with_data(vec![0xde, 0xad, 0x00]);
        let reference = TxLegacy {
            chain_id: Some(1),
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: alloy::primitives::TxKind::Call(Address::repeat_byte(0x35)),
            value: U256::from(1_000_000_000_000_000_000u64),
            input: vec![0xde, 0xad, 0x00].into(),
        };
        let ours = keccak256(LegacyStrategy.signing_preimage(&tx).unwrap());
        assert_eq!(ours, reference.signature_hash());
    }

    #[test]
    fn v_folds_chain_id() {
        assert_eq!(LegacyStrategy.encode_v(97, false).unwrap(), 229);
        assert_eq!(LegacyStrategy.encode_v(97, true).unwrap(), 230);
        assert_eq!(LegacyStrategy.encode_v(31, true).unwrap(), 98);
    }

    #[test]
    fn v_at_largest_chain_id_fits() {
        assert_eq!(LegacyStrategy.encode_v(MAX_LEGACY_CHAIN_ID, true).unwrap(), u64::MAX - 1);
        assert!(matches!(
            LegacyStrategy.encode_v(MAX_LEGACY_CHAIN_ID + 1, true),
            Err(KeyringError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn oversized_chain_id_rejected_before_signing() {
        let signer = parse_private_key(HARDHAT_KEY_1).unwrap();
        let tx = RawTransactionRequest::new(u64::MAX)
            .with_nonce(0)
            .with_gas_price(1)
            .with_to(Address::repeat_byte(0x11));
        let err = sign_transaction(&tx, TxType::Legacy, &signer).unwrap_err();
        assert!(matches!(err, KeyringError::MalformedTransaction(_)), "{err}");
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn largest_chain_id_signs() {
        let signer = parse_private_key(HARDHAT_KEY_1).unwrap();
        let tx = RawTransactionRequest::new(MAX_LEGACY_CHAIN_ID)
            .with_nonce(0)
            .with_gas_price(1)
            .with_to(Address::repeat_byte(0x11));
        let signed = sign_transaction(&tx, TxType::Legacy, &signer).unwrap();
        assert_eq!(signed.v, u64::MAX - 2 + u64::from(signed.y_parity));
        assert_eq!(signed.recover_signer().unwrap(), signer.address());
    }

    #[test]
    fn missing_gas_price_rejected() {
        let mut tx = eip155_example();
        tx.gas_price = None;
        assert!(matches!(
            LegacyStrategy.validate(&tx),
            Err(KeyringError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn fee_market_fields_rejected() {
        let tx = eip155_example().with_fee_caps(1, 2);
        assert!(matches!(
            LegacyStrategy.validate(&tx),
            Err(KeyringError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn signer_recovers_on_bsc_testnet() {
        let signer = parse_private_key(HARDHAT_KEY_1).unwrap();
        let tx = RawTransactionRequest::new(97)
            .with_nonce(0)
            .with_gas_price(10_000_000_000)
            .with_to(Address::repeat_byte(0x11))
            .with_value(U256::from(1u64));
        let signed = sign_transaction(&tx, TxType::Legacy, &signer).unwrap();
        assert_eq!(signed.recover_signer().unwrap(), signer.address());
        assert!(signed.v == 229 || signed.v == 230);
        assert!(signed.raw[0] >= 0xc0);
    }
}

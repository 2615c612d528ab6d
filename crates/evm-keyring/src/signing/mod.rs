//! Per-chain transaction signing.
//!
//! A request is routed to one of two strategies: [`LegacyStrategy`]
//! (type 0, EIP-155 replay protection) or [`FeeMarketStrategy`] (type 2,
//! EIP-1559). The request's explicit `type` wins; otherwise the controller's
//! configured default applies. Each strategy validates its fee fields,
//! builds the canonical RLP preimage, signs its keccak256 hash, and appends
//! `(v, r, s)` in its own convention.

mod fee_market;
mod legacy;
mod rlp;

use std::fmt;

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{Address, B256, Bytes, Signature, U256, keccak256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::error::{KeyringError, Result};

pub use fee_market::FeeMarketStrategy;
pub use legacy::{LegacyStrategy, MAX_LEGACY_CHAIN_ID};

/// Base cost of any transaction.
pub const TX_BASE_GAS: u64 = 21_000;

/// Base cost of a contract-creation transaction.
pub const TX_CREATE_GAS: u64 = 53_000;

/// Calldata cost per zero byte.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Calldata cost per non-zero byte.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Transaction envelope type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    /// Type 0: single gas price, chain id folded into `v`.
    Legacy,
    /// Type 2: base fee plus priority fee.
    #[default]
    FeeMarket,
}

impl TxType {
    /// EIP-2718 type byte.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::FeeMarket => 2,
        }
    }
}

impl TryFrom<u8> for TxType {
    type Error = KeyringError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Legacy),
            2 => Ok(Self::FeeMarket),
            other => Err(KeyringError::MalformedTransaction(format!(
                "unsupported transaction type {other}"
            ))),
        }
    }
}

impl From<TxType> for u8 {
    fn from(value: TxType) -> Self {
        value.as_u8()
    }
}

impl Serialize for TxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", self.as_u8()))
    }
}

impl<'de> Deserialize<'de> for TxType {
    /// Accepts a JSON number or a hex quantity string (`"0x2"`).
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u8),
            Quantity(String),
        }
        let byte = match Repr::deserialize(deserializer)? {
            Repr::Number(n) => n,
            Repr::Quantity(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(&s);
                u8::from_str_radix(digits, 16).map_err(D::Error::custom)?
            }
        };
        Self::try_from(byte).map_err(D::Error::custom)
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::FeeMarket => f.write_str("fee-market"),
        }
    }
}

/// Unsigned transaction as submitted by a caller.
///
/// Which fee fields are required depends on the resolved [`TxType`]:
/// legacy needs `gas_price`, fee-market needs both `max_fee_per_gas` and
/// `max_priority_fee_per_gas`. Fee fields are never filled in implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionRequest {
    /// Expected sender; checked against the signing key when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Recipient; `None` creates a contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Wei transferred.
    #[serde(default)]
    pub value: U256,
    /// Sender nonce.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy::serde::quantity::opt")]
    pub nonce: Option<u64>,
    /// Calldata.
    #[serde(default)]
    pub data: Bytes,
    /// EIP-155 chain id.
    #[serde(with = "alloy::serde::quantity")]
    pub chain_id: u64,
    /// Gas limit; defaults to the request's intrinsic gas.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy::serde::quantity::opt")]
    pub gas_limit: Option<u64>,
    /// Legacy gas price in wei.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy::serde::quantity::opt")]
    pub gas_price: Option<u128>,
    /// EIP-1559 tip cap in wei.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy::serde::quantity::opt")]
    pub max_priority_fee_per_gas: Option<u128>,
    /// EIP-1559 fee cap in wei.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy::serde::quantity::opt")]
    pub max_fee_per_gas: Option<u128>,
    /// EIP-2930 access list (fee-market only).
    #[serde(default, skip_serializing_if = "access_list_is_empty")]
    pub access_list: AccessList,
    /// Explicit envelope type; overrides the controller default.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<TxType>,
}

impl RawTransactionRequest {
    /// Empty request for `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    /// Set the sender.
    #[must_use]
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the recipient.
    #[must_use]
    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the transferred value.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the calldata.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the gas limit.
    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Set a legacy gas price.
    #[must_use]
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Set both EIP-1559 fee caps.
    #[must_use]
    pub fn with_fee_caps(mut self, max_priority_fee_per_gas: u128, max_fee_per_gas: u128) -> Self {
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self
    }

    /// Pin the envelope type.
    #[must_use]
    pub fn with_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    /// The type this request signs as, given the controller default.
    pub fn resolved_type(&self, default: TxType) -> TxType {
        self.tx_type.unwrap_or(default)
    }

    /// Gas charged before execution: base cost plus calldata.
    pub fn intrinsic_gas(&self) -> u64 {
        let base = if self.to.is_some() { TX_BASE_GAS } else { TX_CREATE_GAS };
        self.data.iter().fold(base, |gas, byte| {
            gas.saturating_add(if *byte == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            })
        })
    }

    /// Explicit gas limit, or the intrinsic gas when none was given.
    pub fn effective_gas_limit(&self) -> u64 {
        self.gas_limit.unwrap_or_else(|| self.intrinsic_gas())
    }

    pub(crate) fn require_nonce(&self) -> Result<u64> {
        self.nonce
            .ok_or_else(|| KeyringError::MalformedTransaction("missing nonce".into()))
    }

    pub(crate) fn require_chain_id(&self) -> Result<u64> {
        if self.chain_id == 0 {
            return Err(KeyringError::MalformedTransaction("chain id must be non-zero".into()));
        }
        Ok(self.chain_id)
    }
}

fn access_list_is_empty(list: &AccessList) -> bool {
    list.0.is_empty()
}

/// A signed, broadcast-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Envelope type that was signed.
    pub tx_type: TxType,
    /// Encoded transaction (EIP-2718 typed envelope or legacy RLP).
    pub raw: Bytes,
    /// Transaction hash, `keccak256(raw)`.
    pub hash: B256,
    /// Digest that was signed.
    pub signing_hash: B256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
    /// Encoded recovery value (`recid + 35 + 2 * chain_id` for legacy, `recid` for fee-market).
    pub v: u64,
    /// Raw recovery id.
    pub y_parity: bool,
}

impl SignedTransaction {
    /// `0x`-prefixed hex of the raw encoding.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    /// The ECDSA signature with its raw parity.
    pub fn signature(&self) -> Signature {
        Signature::new(self.r, self.s, self.y_parity)
    }

    /// Recover the sender from the signature.
    pub fn recover_signer(&self) -> Result<Address> {
        self.signature()
            .recover_address_from_prehash(&self.signing_hash)
            .map_err(|e| KeyringError::Signing(e.to_string()))
    }
}

/// Encoder and signer for one transaction type.
pub trait SigningStrategy: Send + Sync {
    /// Type this strategy produces.
    fn tx_type(&self) -> TxType;

    /// Check that the request carries exactly the fields this type needs.
    fn validate(&self, tx: &RawTransactionRequest) -> Result<()>;

    /// Canonical bytes whose keccak256 is signed.
    fn signing_preimage(&self, tx: &RawTransactionRequest) -> Result<Vec<u8>>;

    /// Recovery value as it appears in the encoding.
    fn encode_v(&self, chain_id: u64, y_parity: bool) -> Result<u64>;

    /// Final encoding with the signature attached.
    fn encode_signed(&self, tx: &RawTransactionRequest, signature: &Signature) -> Result<Vec<u8>>;
}

/// Strategy for a transaction type.
pub fn strategy_for(tx_type: TxType) -> &'static dyn SigningStrategy {
    match tx_type {
        TxType::Legacy => &LegacyStrategy,
        TxType::FeeMarket => &FeeMarketStrategy,
    }
}

/// Hash that will be signed for `tx` under the resolved type.
pub fn signing_hash(tx: &RawTransactionRequest, default_type: TxType) -> Result<B256> {
    let strategy = strategy_for(tx.resolved_type(default_type));
    strategy.validate(tx)?;
    Ok(keccak256(strategy.signing_preimage(tx)?))
}

/// Validate, hash, sign and encode a transaction.
///
/// The strategy comes from `tx.tx_type`, falling back to `default_type`.
/// A `from` field that does not match the signer is rejected.
pub fn sign_transaction(
    tx: &RawTransactionRequest,
    default_type: TxType,
    signer: &PrivateKeySigner,
) -> Result<SignedTransaction> {
    sign_transaction_with(tx, default_type, signer.address(), |hash| {
        signer
            .sign_hash_sync(hash)
            .map_err(|e| KeyringError::Signing(e.to_string()))
    })
}

/// [`sign_transaction`] with the digest signed by `sign` on behalf of
/// `signer_address`, for keys that never leave their keyring.
pub fn sign_transaction_with<F>(
    tx: &RawTransactionRequest,
    default_type: TxType,
    signer_address: Address,
    sign: F,
) -> Result<SignedTransaction>
where
    F: FnOnce(&B256) -> Result<Signature>,
{
    if let Some(from) = tx.from {
        if from != signer_address {
            return Err(KeyringError::MalformedTransaction(format!(
                "from {from} does not match signing key {signer_address}"
            )));
        }
    }

    let strategy = strategy_for(tx.resolved_type(default_type));
    strategy.validate(tx)?;
    let signing_hash = keccak256(strategy.signing_preimage(tx)?);
    let signature = sign(&signing_hash)?;
    let v = strategy.encode_v(tx.chain_id, signature.v())?;
    let raw = Bytes::from(strategy.encode_signed(tx, &signature)?);
    let hash = keccak256(&raw);

    info!(
        chain_id = tx.chain_id,
        tx_type = %strategy.tx_type(),
        %hash,
        "transaction signed"
    );

    Ok(SignedTransaction {
        tx_type: strategy.tx_type(),
        hash,
        signing_hash,
        r: signature.r(),
        s: signature.s(),
        v,
        y_parity: signature.v(),
        raw,
    })
}

//! Raw secp256k1 private key handling and address formatting.
//!
//! Private keys travel as hex strings at the API boundary (import, export,
//! custom signing) and as [`PrivateKeySigner`] everywhere else. The signer's
//! inner `SigningKey` zeroizes itself on drop.

use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use crate::error::{KeyringError, Result};

/// Length of a raw secp256k1 scalar in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of an `r || s || v` message signature in bytes.
pub const SIGNATURE_LEN: usize = 65;

/// Parse a hex private key (with or without `0x`) into a signer.
///
/// Rejects anything that is not exactly 32 bytes, zero, or not below the
/// curve order.
pub fn parse_private_key(input: &str) -> Result<PrivateKeySigner> {
    let trimmed = input.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex_str.len() != PRIVATE_KEY_LEN * 2 {
        return Err(KeyringError::InvalidPrivateKey(format!(
            "expected {} hex characters, got {}",
            PRIVATE_KEY_LEN * 2,
            hex_str.len()
        )));
    }
    let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    hex::decode_to_slice(hex_str, bytes.as_mut_slice())
        .map_err(|e| KeyringError::InvalidPrivateKey(e.to_string()))?;
    PrivateKeySigner::from_slice(bytes.as_slice())
        .map_err(|_| KeyringError::InvalidPrivateKey("scalar out of curve order".into()))
}

/// Export a signer's private key as `0x`-prefixed lowercase hex.
pub fn private_key_hex(signer: &PrivateKeySigner) -> Zeroizing<String> {
    let bytes = Zeroizing::new(signer.to_bytes().0);
    Zeroizing::new(format!("0x{}", hex::encode(bytes.as_slice())))
}

/// EIP-55 mixed-case checksum form of an address.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Serialize a message signature as `0x || r || s || v` with `v` in {27, 28}.
pub fn signature_to_hex(signature: &Signature) -> String {
    format!("0x{}", hex::encode(signature.as_bytes()))
}

/// Parse a 65-byte hex signature. Accepts `v` as 0/1 or 27/28.
pub fn signature_from_hex(input: &str) -> Result<Signature> {
    let trimmed = input.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_str)
        .map_err(|e| KeyringError::Signing(format!("invalid signature encoding: {e}")))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(KeyringError::Signing(format!(
            "expected {SIGNATURE_LEN} signature bytes, got {}",
            bytes.len()
        )));
    }
    // EIP-155 style values are transaction-only.
    if !matches!(bytes[SIGNATURE_LEN - 1], 0 | 1 | 27 | 28) {
        return Err(KeyringError::Signing(format!(
            "invalid recovery value {}",
            bytes[SIGNATURE_LEN - 1]
        )));
    }
    Signature::try_from(bytes.as_slice()).map_err(|e| KeyringError::Signing(e.to_string()))
}

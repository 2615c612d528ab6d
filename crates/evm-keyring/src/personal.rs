//! Personal message signing (`eth_sign` / `personal_sign` style).

use alloy::primitives::{Address, B256, eip191_hash_message};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;

use crate::error::{KeyringError, Result};
use crate::keys;

/// Header prepended to every personal message before hashing.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Bytes of a caller-supplied message.
///
/// A `0x`-prefixed even-length hex string is taken as raw bytes; anything
/// else is signed as its UTF-8 encoding.
pub fn message_bytes(input: &str) -> Vec<u8> {
    input
        .strip_prefix("0x")
        .filter(|h| h.len() % 2 == 0)
        .and_then(|h| hex::decode(h).ok())
        .unwrap_or_else(|| input.as_bytes().to_vec())
}

/// `keccak256(prefix || len(message) || message)`.
pub fn personal_message_hash(message: &[u8]) -> B256 {
    eip191_hash_message(message)
}

/// Sign a personal message, returning the 65-byte hex signature.
pub fn sign_personal_message(signer: &PrivateKeySigner, message: &[u8]) -> Result<String> {
    let signature = signer
        .sign_message_sync(message)
        .map_err(|e| KeyringError::Signing(format!("message signing failed: {e}")))?;
    Ok(keys::signature_to_hex(&signature))
}

/// Sign with a raw private key, bypassing any vault.
pub fn custom_personal_sign(private_key: &str, message: &[u8]) -> Result<String> {
    let signer = keys::parse_private_key(private_key)?;
    sign_personal_message(&signer, message)
}

/// Recover the address that produced `signature` over `message`.
pub fn recover_personal_signer(message: &[u8], signature: &str) -> Result<Address> {
    keys::signature_from_hex(signature)?
        .recover_address_from_prehash(&personal_message_hash(message))
        .map_err(|e| KeyringError::Signing(e.to_string()))
}

//! BIP-39 mnemonic generation and validation.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{KeyringError, Result};

/// Word counts accepted by BIP-39.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Generate a fresh English mnemonic with `word_count` words from OS entropy.
pub fn generate_mnemonic(word_count: usize) -> Result<Zeroizing<String>> {
    if !VALID_WORD_COUNTS.contains(&word_count) {
        return Err(KeyringError::InvalidMnemonic(format!(
            "unsupported word count {word_count}"
        )));
    }
    // 32 bits of entropy per 3 words.
    let mut entropy = Zeroizing::new(vec![0u8; word_count / 3 * 4]);
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let m = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(m.to_string()))
}

/// Validate a phrase (word list and checksum) and return its normalized form.
///
/// Normalizes whitespace and converts to lowercase before parsing.
pub fn normalize_mnemonic(phrase: &str) -> Result<Zeroizing<String>> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    );
    let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if !VALID_WORD_COUNTS.contains(&words) {
        return Err(KeyringError::InvalidMnemonic(format!(
            "expected 12, 15, 18, 21 or 24 words, got {words}"
        )));
    }
    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))?;
    Ok(normalized)
}

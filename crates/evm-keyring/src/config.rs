//! Controller configuration.
//!
//! [`ControllerConfig`] carries the per-instance defaults: which transaction
//! type to sign with when a request does not say, how fee tiers are
//! derived, and how long to wait on the chain provider.

use std::time::Duration;

use crate::chains::ChainPreset;
use crate::fees::FeePolicy;
use crate::signing::TxType;

/// Default bound on each provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Default length of generated mnemonics.
pub const DEFAULT_MNEMONIC_WORD_COUNT: usize = 12;

/// Configuration for a [`KeyringController`](crate::controller::KeyringController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Signing strategy for requests that omit `type`.
    pub default_tx_type: TxType,
    /// Fee tier multipliers.
    pub fee_policy: FeePolicy,
    /// Deadline applied to each provider call.
    pub provider_timeout: Duration,
    /// Words in a freshly generated mnemonic (12, 15, 18, 21 or 24).
    pub mnemonic_word_count: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_tx_type: TxType::FeeMarket,
            fee_policy: FeePolicy::default(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            mnemonic_word_count: DEFAULT_MNEMONIC_WORD_COUNT,
        }
    }
}

impl ControllerConfig {
    /// Defaults, with the transaction type taken from a chain preset.
    pub fn for_chain(preset: &ChainPreset) -> Self {
        Self::default().with_tx_type(preset.tx_type)
    }

    #[must_use]
    pub fn with_tx_type(mut self, tx_type: TxType) -> Self {
        self.default_tx_type = tx_type;
        self
    }

    #[must_use]
    pub fn with_fee_policy(mut self, fee_policy: FeePolicy) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_mnemonic_word_count(mut self, words: usize) -> Self {
        self.mnemonic_word_count = words;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains;

    #[test]
    fn defaults() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.default_tx_type, TxType::FeeMarket);
        assert_eq!(cfg.provider_timeout, Duration::from_secs(10));
        assert_eq!(cfg.mnemonic_word_count, 12);
        assert_eq!(cfg.fee_policy, FeePolicy::default());
    }

    #[test]
    fn for_chain_picks_tx_type() {
        let bsc = chains::by_name("bsc").unwrap();
        assert_eq!(ControllerConfig::for_chain(bsc).default_tx_type, TxType::Legacy);
        let base = chains::by_name("base").unwrap();
        assert_eq!(ControllerConfig::for_chain(base).default_tx_type, TxType::FeeMarket);
    }

    #[test]
    fn builders_override() {
        let cfg = ControllerConfig::default()
            .with_tx_type(TxType::Legacy)
            .with_provider_timeout(Duration::from_millis(250))
            .with_mnemonic_word_count(24);
        assert_eq!(cfg.default_tx_type, TxType::Legacy);
        assert_eq!(cfg.provider_timeout, Duration::from_millis(250));
        assert_eq!(cfg.mnemonic_word_count, 24);
    }
}

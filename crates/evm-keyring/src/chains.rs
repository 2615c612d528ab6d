//! Known EVM networks and their signing defaults.
//!
//! The table covers the test networks the keyring is exercised against.
//! Each entry fixes the transaction type a controller should default to on
//! that chain.

use crate::signing::TxType;

/// Static description of one EVM network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPreset {
    /// Short lookup name.
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Native currency symbol.
    pub symbol: &'static str,
    /// Transaction type to sign with by default.
    pub tx_type: TxType,
    /// Public JSON-RPC endpoint.
    pub rpc_url: &'static str,
}

const fn preset(
    name: &'static str,
    chain_id: u64,
    symbol: &'static str,
    tx_type: TxType,
    rpc_url: &'static str,
) -> ChainPreset {
    ChainPreset {
        name,
        chain_id,
        symbol,
        tx_type,
        rpc_url,
    }
}

/// All presets, fee-market chains first.
pub const CHAIN_PRESETS: &[ChainPreset] = &[
    preset("ethereum", 5, "ETH", TxType::FeeMarket, "https://eth-goerli.public.blastapi.io"),
    preset(
        "polygon",
        80001,
        "MATIC",
        TxType::FeeMarket,
        "https://polygon-amoy.blockpi.network/v1/rpc/public",
    ),
    preset("optimism", 420, "OP", TxType::FeeMarket, "https://optimism-goerli.public.blastapi.io"),
    preset("arbitrum", 421614, "ARB", TxType::FeeMarket, "https://sepolia-rollup.arbitrum.io/rpc"),
    preset("mantle", 5001, "MNT", TxType::FeeMarket, "https://rpc.ankr.com/mantle_sepolia"),
    preset(
        "avalanche",
        43113,
        "AVAX",
        TxType::FeeMarket,
        "https://api.avax-test.network/ext/bc/C/rpc",
    ),
    preset(
        "base",
        84532,
        "BASE",
        TxType::FeeMarket,
        "https://base-sepolia.blockpi.network/v1/rpc/public",
    ),
    preset(
        "zkevm",
        1442,
        "ZKEVM",
        TxType::FeeMarket,
        "https://endpoints.omniatech.io/v1/polygon-zkevm/testnet/public",
    ),
    preset("bsc", 97, "BSC", TxType::Legacy, "https://data-seed-prebsc-1-s1.binance.org:8545/"),
    preset("velas", 111, "VLX", TxType::Legacy, "https://explorer.testnet.velas.com/rpc"),
    preset("bevm", 1978, "BTC", TxType::Legacy, "https://testnet.bevm.io/"),
    preset("rootstock", 31, "RBTC", TxType::Legacy, "https://public-node.testnet.rsk.co"),
];

/// Look up a preset by name, case-insensitively.
pub fn by_name(name: &str) -> Option<&'static ChainPreset> {
    CHAIN_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Look up a preset by chain id.
pub fn by_chain_id(chain_id: u64) -> Option<&'static ChainPreset> {
    CHAIN_PRESETS.iter().find(|p| p.chain_id == chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn twelve_networks() {
        assert_eq!(CHAIN_PRESETS.len(), 12);
    }

    #[test]
    fn chain_ids_and_names_unique() {
        let ids: HashSet<u64> = CHAIN_PRESETS.iter().map(|p| p.chain_id).collect();
        let names: HashSet<&str> = CHAIN_PRESETS.iter().map(|p| p.name).collect();
        assert_eq!(ids.len(), CHAIN_PRESETS.len());
        assert_eq!(names.len(), CHAIN_PRESETS.len());
    }

    #[test]
    fn legacy_chains() {
        let legacy: Vec<&str> = CHAIN_PRESETS
            .iter()
            .filter(|p| p.tx_type == TxType::Legacy)
            .map(|p| p.name)
            .collect();
        assert_eq!(legacy, vec!["bsc", "velas", "bevm", "rootstock"]);
    }

    #[test]
    fn lookup() {
        assert_eq!(by_name("BSC").map(|p| p.chain_id), Some(97));
        assert_eq!(by_name("zkEVM").map(|p| p.chain_id), Some(1442));
        assert_eq!(by_chain_id(421614).map(|p| p.name), Some("arbitrum"));
        assert!(by_name("solana").is_none());
    }

    #[test]
    fn urls_are_trimmed_https() {
        for p in CHAIN_PRESETS {
            assert!(p.rpc_url.starts_with("https://"), "{}", p.name);
            assert_eq!(p.rpc_url, p.rpc_url.trim());
        }
    }
}

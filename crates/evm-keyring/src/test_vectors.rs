//! Known keys and addresses shared by the unit tests.

/// Development mnemonic whose first accounts are widely published.
pub const HARDHAT_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Private key of account 0 of [`HARDHAT_MNEMONIC`].
pub const HARDHAT_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address of [`HARDHAT_KEY_0`].
pub const HARDHAT_ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Private key of account 1 of [`HARDHAT_MNEMONIC`].
pub const HARDHAT_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Address of [`HARDHAT_KEY_1`].
pub const HARDHAT_ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{checksum, parse_private_key};

    #[test]
    fn keys_are_64_hex_digits() {
        for key in [HARDHAT_KEY_0, HARDHAT_KEY_1] {
            assert_eq!(key.len(), 66, "{key}");
        }
    }

    #[test]
    fn keys_match_their_addresses() {
        let pairs = [(HARDHAT_KEY_0, HARDHAT_ADDRESS_0), (HARDHAT_KEY_1, HARDHAT_ADDRESS_1)];
        for (key, address) in pairs {
            assert_eq!(checksum(&parse_private_key(key).unwrap().address()), address);
        }
    }
}

//! Criterion benchmarks for evm-keyring hot paths.
//!
//! Covers: HD account derivation, legacy and fee-market transaction signing,
//! EIP-712 hashing, and vault encryption with cheap KDF parameters.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use alloy::primitives::{Address, U256};
use evm_keyring::encryption::{Encryptor, PasswordEncryptor};
use evm_keyring::keyring::{HdKeyring, Keyring};
use evm_keyring::keys::parse_private_key;
use evm_keyring::signing::{RawTransactionRequest, TxType, sign_transaction};
use evm_keyring::typed_data::TypedDataPayload;
use evm_keyring::vault::Vault;

const HARDHAT: &str = "test test test test test test test test test test test junk";
const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn sample_tx(chain_id: u64) -> RawTransactionRequest {
    RawTransactionRequest::new(chain_id)
        .with_to(Address::repeat_byte(0xca))
        .with_value(U256::from(10_000_000_000_000_000u64))
        .with_nonce(7)
        .with_data(vec![0u8])
}

fn bench_hd_derivation(c: &mut Criterion) {
    c.bench_function("hd_restore_5_accounts", |b| {
        b.iter(|| HdKeyring::restore(black_box(HARDHAT), 5).unwrap())
    });
}

fn bench_transaction_signing(c: &mut Criterion) {
    let signer = parse_private_key(KEY).unwrap();
    let legacy = sample_tx(97).with_gas_price(20_000_000_000);
    let fee_market = sample_tx(5).with_fee_caps(1_000_000_000, 20_000_000_000);

    c.bench_function("sign_legacy_tx", |b| {
        b.iter(|| sign_transaction(black_box(&legacy), TxType::Legacy, &signer).unwrap())
    });

    c.bench_function("sign_fee_market_tx", |b| {
        b.iter(|| sign_transaction(black_box(&fee_market), TxType::FeeMarket, &signer).unwrap())
    });
}

fn bench_typed_data_hash(c: &mut Criterion) {
    let payload = TypedDataPayload::from_json(
        r#"{
            "types": {
                "Person": [{"name": "name", "type": "string"}, {"name": "wallet", "type": "address"}],
                "Mail": [{"name": "from", "type": "Person"}, {"name": "to", "type": "Person"}, {"name": "contents", "type": "string"}]
            },
            "primaryType": "Mail",
            "domain": {"name": "Ether Mail", "version": "1", "chainId": 1,
                       "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"},
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        }"#,
    )
    .unwrap();

    c.bench_function("eip712_signing_hash", |b| {
        b.iter(|| black_box(&payload).signing_hash().unwrap())
    });
}

fn bench_vault_encryption(c: &mut Criterion) {
    let encryptor = PasswordEncryptor::with_params(8, 1, 1).unwrap();
    let vault = Vault::from_keyrings(&[Keyring::Hd(HdKeyring::restore(HARDHAT, 3).unwrap())]);
    let blob = encryptor.encrypt("password", &vault).unwrap();

    c.bench_function("vault_encrypt", |b| {
        b.iter(|| encryptor.encrypt("password", black_box(&vault)).unwrap())
    });

    c.bench_function("vault_decrypt", |b| {
        b.iter(|| encryptor.decrypt("password", black_box(&blob)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_hd_derivation,
    bench_transaction_signing,
    bench_typed_data_hash,
    bench_vault_encryption
);
criterion_main!(benches);

//! RLP list helpers shared by the strategies.

use alloy::primitives::{Address, TxKind};
use alloy::rlp::{Encodable, Header};

/// Encode `fields` as one RLP list, optionally behind an EIP-2718 type byte.
pub(crate) fn encode_list(type_byte: Option<u8>, fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|f| f.length()).sum();
    let header = Header {
        list: true,
        payload_length,
    };
    let mut out = Vec::with_capacity(1 + header.length() + payload_length);
    if let Some(ty) = type_byte {
        out.push(ty);
    }
    header.encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

/// `to` field: the address, or the empty string for contract creation.
pub(crate) fn tx_kind(to: Option<Address>) -> TxKind {
    match to {
        Some(address) => TxKind::Call(address),
        None => TxKind::Create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        assert_eq!(encode_list(None, &[]), vec![0xc0]);
    }

    #[test]
    fn typed_prefix() {
        assert_eq!(encode_list(Some(2), &[&1u8]), vec![0x02, 0xc1, 0x01]);
    }

    #[test]
    fn create_encodes_empty_string() {
        let mut out = Vec::new();
        tx_kind(None).encode(&mut out);
        assert_eq!(out, vec![0x80]);
    }
}

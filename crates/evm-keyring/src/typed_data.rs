//! EIP-712 typed structured data hashing and signing.
//!
//! The signing hash is `keccak256(0x19 0x01 || domainSeparator || hashStruct(message))`,
//! where `hashStruct(s) = keccak256(typeHash(s) || encodeData(s))`. When the
//! primary type is `EIP712Domain` itself, the message hash is omitted.
//!
//! Values arrive as JSON. Integers may be JSON numbers, decimal strings or
//! `0x` hex strings; byte values are `0x` hex strings.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{KeyringError, Result};
use crate::keys;

/// Name of the domain struct.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedField {
    /// Member name.
    pub name: String,
    /// Solidity type, e.g. `address`, `uint256[]`, `Person`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedField {
    /// Field `name` of type `type_name`.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A complete `eth_signTypedData_v4` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    /// Struct definitions by name.
    pub types: BTreeMap<String, Vec<TypedField>>,
    /// Struct type of `message`.
    pub primary_type: String,
    /// Domain values.
    #[serde(default)]
    pub domain: Value,
    /// Message values.
    #[serde(default)]
    pub message: Value,
}

impl TypedDataPayload {
    /// Parse a JSON payload.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KeyringError::TypedDataSchema(format!("invalid payload: {e}")))
    }

    /// Fields of `EIP712Domain`: from `types` when declared, otherwise
    /// inferred from the domain values present, in canonical order.
    pub fn domain_fields(&self) -> Vec<TypedField> {
        if let Some(fields) = self.types.get(DOMAIN_TYPE) {
            return fields.clone();
        }
        const CANONICAL: [(&str, &str); 5] = [
            ("name", "string"),
            ("version", "string"),
            ("chainId", "uint256"),
            ("verifyingContract", "address"),
            ("salt", "bytes32"),
        ];
        CANONICAL
            .iter()
            .filter(|(name, _)| self.domain.get(name).is_some_and(|v| !v.is_null()))
            .map(|(name, ty)| TypedField::new(*name, *ty))
            .collect()
    }

    fn encoder(&self) -> Encoder<'_> {
        Encoder {
            types: &self.types,
            domain_fields: self.domain_fields(),
        }
    }

    /// `encodeType` of a struct: the type followed by its sorted dependencies.
    pub fn encode_type(&self, name: &str) -> Result<String> {
        self.encoder().encode_type(name)
    }

    /// `keccak256(encodeType(name))`.
    pub fn type_hash(&self, name: &str) -> Result<B256> {
        Ok(keccak256(self.encode_type(name)?))
    }

    /// `hashStruct(EIP712Domain, domain)`.
    pub fn domain_separator(&self) -> Result<B256> {
        self.encoder().hash_struct(DOMAIN_TYPE, &self.domain)
    }

    /// `hashStruct(primaryType, message)`, or `None` when the primary type
    /// is the domain.
    pub fn message_hash(&self) -> Result<Option<B256>> {
        if self.primary_type == DOMAIN_TYPE {
            return Ok(None);
        }
        self.encoder()
            .hash_struct(&self.primary_type, &self.message)
            .map(Some)
    }

    /// Final digest to sign.
    pub fn signing_hash(&self) -> Result<B256> {
        let encoder = self.encoder();
        let domain_separator = encoder.hash_struct(DOMAIN_TYPE, &self.domain)?;
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(domain_separator.as_slice());
        if self.primary_type != DOMAIN_TYPE {
            let message_hash = encoder.hash_struct(&self.primary_type, &self.message)?;
            preimage.extend_from_slice(message_hash.as_slice());
        }
        Ok(keccak256(preimage))
    }
}

/// Sign a payload, returning the 65-byte hex signature.
pub fn sign_typed_data(signer: &PrivateKeySigner, payload: &TypedDataPayload) -> Result<String> {
    let hash = payload.signing_hash()?;
    debug!(primary_type = %payload.primary_type, %hash, "signing typed data");
    let signature = signer
        .sign_hash_sync(&hash)
        .map_err(|e| KeyringError::Signing(e.to_string()))?;
    Ok(keys::signature_to_hex(&signature))
}

/// Sign with a raw private key, bypassing any vault.
pub fn custom_sign_typed_message(private_key: &str, payload: &TypedDataPayload) -> Result<String> {
    let signer = keys::parse_private_key(private_key)?;
    sign_typed_data(&signer, payload)
}

/// Recover the signer of a typed-data signature.
pub fn recover_typed_data_signer(payload: &TypedDataPayload, signature: &str) -> Result<Address> {
    keys::signature_from_hex(signature)?
        .recover_address_from_prehash(&payload.signing_hash()?)
        .map_err(|e| KeyringError::Signing(e.to_string()))
}

fn schema_err(msg: impl Into<String>) -> KeyringError {
    KeyringError::TypedDataSchema(msg.into())
}

/// Split `T[]` / `T[n]` into the element type and optional fixed length.
fn split_array(type_name: &str) -> Result<Option<(&str, Option<usize>)>> {
    let Some(inner) = type_name.strip_suffix(']') else {
        return Ok(None);
    };
    let open = inner
        .rfind('[')
        .ok_or_else(|| schema_err(format!("malformed array type {type_name}")))?;
    let (element, len) = (&inner[..open], &inner[open + 1..]);
    if len.is_empty() {
        return Ok(Some((element, None)));
    }
    let len = len
        .parse::<usize>()
        .map_err(|_| schema_err(format!("malformed array length in {type_name}")))?;
    Ok(Some((element, Some(len))))
}

/// Bit width of `uintN` / `intN`, validated.
fn int_width(type_name: &str, prefix: &str) -> Option<usize> {
    let suffix = type_name.strip_prefix(prefix)?;
    if suffix.is_empty() {
        return Some(256);
    }
    let bits = suffix.parse::<usize>().ok()?;
    (bits > 0 && bits <= 256 && bits % 8 == 0).then_some(bits)
}

/// Byte width of `bytesN`, validated.
fn fixed_bytes_width(type_name: &str) -> Option<usize> {
    let len = type_name.strip_prefix("bytes")?.parse::<usize>().ok()?;
    (1..=32).contains(&len).then_some(len)
}

fn is_atomic_or_dynamic(type_name: &str) -> bool {
    matches!(type_name, "bool" | "address" | "string" | "bytes")
        || int_width(type_name, "uint").is_some()
        || int_width(type_name, "int").is_some()
        || fixed_bytes_width(type_name).is_some()
}

/// Strip all array suffixes: `Person[][2]` -> `Person`.
fn base_type(type_name: &str) -> &str {
    type_name.split('[').next().unwrap_or(type_name)
}

struct Encoder<'a> {
    types: &'a BTreeMap<String, Vec<TypedField>>,
    domain_fields: Vec<TypedField>,
}

impl Encoder<'_> {
    fn fields(&self, name: &str) -> Option<&[TypedField]> {
        if name == DOMAIN_TYPE {
            return Some(&self.domain_fields);
        }
        self.types.get(name).map(Vec::as_slice)
    }

    fn struct_fields(&self, name: &str) -> Result<&[TypedField]> {
        self.fields(name)
            .ok_or_else(|| schema_err(format!("unknown struct type {name}")))
    }

    /// Every struct reachable from `name`, including `name`.
    fn collect_dependencies(&self, name: &str, found: &mut BTreeSet<String>) -> Result<()> {
        if !found.insert(name.to_string()) {
            return Ok(());
        }
        for field in self.struct_fields(name)? {
            let base = base_type(&field.type_name);
            if is_atomic_or_dynamic(base) {
                continue;
            }
            if self.fields(base).is_none() {
                return Err(schema_err(format!(
                    "{name}.{} references undefined type {base}",
                    field.name
                )));
            }
            self.collect_dependencies(base, found)?;
        }
        Ok(())
    }

    fn encode_type(&self, name: &str) -> Result<String> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(name, &mut deps)?;
        deps.remove(name);

        let mut out = String::new();
        for ty in std::iter::once(name).chain(deps.iter().map(String::as_str)) {
            let members: Vec<String> = self
                .struct_fields(ty)?
                .iter()
                .map(|f| format!("{} {}", f.type_name, f.name))
                .collect();
            out.push_str(ty);
            out.push('(');
            out.push_str(&members.join(","));
            out.push(')');
        }
        Ok(out)
    }

    fn hash_struct(&self, name: &str, value: &Value) -> Result<B256> {
        let type_hash = keccak256(self.encode_type(name)?);
        let object = value
            .as_object()
            .ok_or_else(|| schema_err(format!("value for {name} must be an object")))?;

        let fields = self.struct_fields(name)?;
        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(type_hash.as_slice());
        for field in fields {
            let member = object
                .get(&field.name)
                .ok_or_else(|| schema_err(format!("{name} is missing field {}", field.name)))?;
            encoded.extend_from_slice(self.encode_value(&field.type_name, member)?.as_slice());
        }
        Ok(keccak256(encoded))
    }

    /// 32-byte encoding of one member value.
    fn encode_value(&self, type_name: &str, value: &Value) -> Result<B256> {
        if let Some((element, fixed_len)) = split_array(type_name)? {
            let items = value
                .as_array()
                .ok_or_else(|| schema_err(format!("value for {type_name} must be an array")))?;
            if let Some(len) = fixed_len {
                if items.len() != len {
                    return Err(schema_err(format!(
                        "{type_name} expects {len} elements, got {}",
                        items.len()
                    )));
                }
            }
            let mut concat = Vec::with_capacity(32 * items.len());
            for item in items {
                concat.extend_from_slice(self.encode_value(element, item)?.as_slice());
            }
            return Ok(keccak256(concat));
        }

        if self.fields(type_name).is_some() && !is_atomic_or_dynamic(type_name) {
            return self.hash_struct(type_name, value);
        }

        match type_name {
            "string" => {
                let s = value
                    .as_str()
                    .ok_or_else(|| schema_err("string value must be a JSON string"))?;
                Ok(keccak256(s.as_bytes()))
            }
            "bytes" => Ok(keccak256(parse_hex_bytes(value, type_name)?)),
            "bool" => {
                let b = value
                    .as_bool()
                    .ok_or_else(|| schema_err("bool value must be true or false"))?;
                Ok(B256::from(U256::from(u8::from(b))))
            }
            "address" => {
                let s = value
                    .as_str()
                    .ok_or_else(|| schema_err("address value must be a string"))?;
                let address: Address = s
                    .parse()
                    .map_err(|_| schema_err(format!("invalid address {s}")))?;
                Ok(address.into_word())
            }
            _ => {
                if let Some(bits) = int_width(type_name, "uint") {
                    return encode_uint(value, bits, type_name);
                }
                if let Some(bits) = int_width(type_name, "int") {
                    return encode_int(value, bits, type_name);
                }
                if let Some(len) = fixed_bytes_width(type_name) {
                    let bytes = parse_hex_bytes(value, type_name)?;
                    if bytes.len() > len {
                        return Err(schema_err(format!(
                            "{type_name} value has {} bytes",
                            bytes.len()
                        )));
                    }
                    let mut word = B256::ZERO;
                    word[..bytes.len()].copy_from_slice(&bytes);
                    return Ok(word);
                }
                Err(schema_err(format!("unknown type {type_name}")))
            }
        }
    }
}

fn parse_hex_bytes(value: &Value, type_name: &str) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| schema_err(format!("{type_name} value must be a hex string")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| schema_err(format!("invalid {type_name} value: {e}")))
}

/// Parse an integer value into `(negative, magnitude)`.
fn parse_integer(value: &Value, type_name: &str) -> Result<(bool, U256)> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok((false, U256::from(u)))
            } else if let Some(i) = n.as_i64() {
                Ok((i < 0, U256::from(i.unsigned_abs())))
            } else {
                Err(schema_err(format!("{type_name} value {n} is not an integer")))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let (negative, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };
            let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
                None => U256::from_str_radix(digits, 10),
            }
            .map_err(|_| schema_err(format!("invalid {type_name} value {s}")))?;
            Ok((negative && !magnitude.is_zero(), magnitude))
        }
        other => Err(schema_err(format!("{type_name} value must be a number or string, got {other}"))),
    }
}

fn encode_uint(value: &Value, bits: usize, type_name: &str) -> Result<B256> {
    let (negative, magnitude) = parse_integer(value, type_name)?;
    if negative {
        return Err(schema_err(format!("{type_name} value must not be negative")));
    }
    if bits < 256 && magnitude >= (U256::from(1u8) << bits) {
        return Err(schema_err(format!("{type_name} value out of range")));
    }
    Ok(B256::from(magnitude))
}

fn encode_int(value: &Value, bits: usize, type_name: &str) -> Result<B256> {
    let (negative, magnitude) = parse_integer(value, type_name)?;
    let half = U256::from(1u8) << (bits - 1);
    let in_range = if negative { magnitude <= half } else { magnitude < half };
    if !in_range {
        return Err(schema_err(format!("{type_name} value out of range")));
    }
    let word = if negative {
        U256::ZERO.wrapping_sub(magnitude)
    } else {
        magnitude
    };
    Ok(B256::from(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COW_KEY: &str = "0xc85ef7d79691fe79573b1a7064c19c1a9819ebdbd1faaab1a8ec92344438aaf4";

    fn mail() -> TypedDataPayload {
        TypedDataPayload::from_json(
            &json!({
                "types": {
                    "EIP712Domain": [
                        {"name": "name", "type": "string"},
                        {"name": "version", "type": "string"},
                        {"name": "chainId", "type": "uint256"},
                        {"name": "verifyingContract", "type": "address"}
                    ],
                    "Person": [
                        {"name": "name", "type": "string"},
                        {"name": "wallet", "type": "address"}
                    ],
                    "Mail": [
                        {"name": "from", "type": "Person"},
                        {"name": "to", "type": "Person"},
                        {"name": "contents", "type": "string"}
                    ]
                },
                "primaryType": "Mail",
                "domain": {
                    "name": "Ether Mail",
                    "version": "1",
                    "chainId": 1,
                    "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
                },
                "message": {
                    "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                    "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                    "contents": "Hello, Bob!"
                }
            })
            .to_string(),
        )
        .unwrap()
    }

    fn hex32(s: &str) -> B256 {
        s.parse().unwrap()
    }

    #[test]
    fn mail_encode_type() {
        assert_eq!(
            mail().encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            mail().type_hash("Mail").unwrap(),
            hex32("0xa0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2")
        );
    }

    #[test]
    fn mail_hashes() {
        let payload = mail();
        assert_eq!(
            payload.domain_separator().unwrap(),
            hex32("0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
        assert_eq!(
            payload.message_hash().unwrap(),
            Some(hex32("0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"))
        );
        assert_eq!(
            payload.signing_hash().unwrap(),
            hex32("0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn mail_signature_vector() {
        let sig = custom_sign_typed_message(COW_KEY, &mail()).unwrap();
        assert_eq!(
            sig,
            "0x4355c47d63924e8a72e509b65029052eb6c299d53a04e167c5775fd466751c9d\
             07299936d304c153f6443dfa05f40ff007d72911b6f72307f996231605b91562\
             1c"
        );
        let cow: Address = "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826".parse().unwrap();
        assert_eq!(recover_typed_data_signer(&mail(), &sig).unwrap(), cow);
    }

    #[test]
    fn inferred_domain_type_matches_declared() {
        let declared = mail();
        let mut inferred = mail();
        inferred.types.remove(DOMAIN_TYPE);
        assert_eq!(inferred.domain_fields(), declared.domain_fields());
        assert_eq!(inferred.signing_hash().unwrap(), declared.signing_hash().unwrap());
    }

    #[test]
    fn chain_id_as_string_is_equivalent() {
        let mut payload = mail();
        payload.domain["chainId"] = json!("0x1");
        assert_eq!(payload.signing_hash().unwrap(), mail().signing_hash().unwrap());
    }

    #[test]
    fn domain_only_primary_type() {
        let mut payload = mail();
        payload.primary_type = DOMAIN_TYPE.into();
        payload.message = Value::Null;
        assert_eq!(payload.message_hash().unwrap(), None);
        let mut preimage = vec![0x19, 0x01];
        preimage.extend_from_slice(payload.domain_separator().unwrap().as_slice());
        assert_eq!(payload.signing_hash().unwrap(), keccak256(preimage));
    }

    #[test]
    fn dangling_reference_rejected() {
        let mut payload = mail();
        payload.types.remove("Person");
        let err = payload.signing_hash().unwrap_err();
        assert_eq!(
            err,
            KeyringError::TypedDataSchema("Mail.from references undefined type Person".into())
        );
    }

    #[test]
    fn unknown_primary_type_rejected() {
        let mut payload = mail();
        payload.primary_type = "Letter".into();
        assert!(matches!(
            payload.signing_hash(),
            Err(KeyringError::TypedDataSchema(_))
        ));
    }

    #[test]
    fn missing_field_rejected() {
        let mut payload = mail();
        payload.message.as_object_mut().unwrap().remove("contents");
        assert_eq!(
            payload.signing_hash().unwrap_err(),
            KeyringError::TypedDataSchema("Mail is missing field contents".into())
        );
    }

    #[test]
    fn unreferenced_types_are_ignored() {
        let mut payload = mail();
        payload
            .types
            .insert("Unused".into(), vec![TypedField::new("x", "Nowhere")]);
        assert_eq!(payload.signing_hash().unwrap(), mail().signing_hash().unwrap());
    }

    #[test]
    fn arrays_hash_concatenated_elements() {
        let mut types = BTreeMap::new();
        types.insert(
            "Batch".to_string(),
            vec![
                TypedField::new("ids", "uint256[]"),
                TypedField::new("owners", "address[2]"),
            ],
        );
        let payload = TypedDataPayload {
            types,
            primary_type: "Batch".into(),
            domain: json!({"name": "Batch", "chainId": 5}),
            message: json!({
                "ids": [1, "2", "0x03"],
                "owners": [
                    "0x0000000000000000000000000000000000000001",
                    "0x0000000000000000000000000000000000000002"
                ]
            }),
        };

        let words = |xs: &[u64]| -> Vec<u8> {
            xs.iter()
                .flat_map(|x| B256::from(U256::from(*x)).0)
                .collect()
        };
        let mut expected = Vec::new();
        expected.extend_from_slice(keccak256("Batch(uint256[] ids,address[2] owners)").as_slice());
        expected.extend_from_slice(keccak256(words(&[1, 2, 3])).as_slice());
        expected.extend_from_slice(keccak256(words(&[1, 2])).as_slice());
        assert_eq!(payload.message_hash().unwrap(), Some(keccak256(expected)));
    }

    #[test]
    fn fixed_array_length_enforced() {
        let mut types = BTreeMap::new();
        types.insert("Pair".to_string(), vec![TypedField::new("v", "uint8[2]")]);
        let payload = TypedDataPayload {
            types,
            primary_type: "Pair".into(),
            domain: json!({"name": "x"}),
            message: json!({"v": [1, 2, 3]}),
        };
        assert!(matches!(
            payload.signing_hash(),
            Err(KeyringError::TypedDataSchema(_))
        ));
    }

    #[test]
    fn recursive_struct_encodes_once() {
        let mut types = BTreeMap::new();
        types.insert(
            "Node".to_string(),
            vec![
                TypedField::new("value", "uint256"),
                TypedField::new("children", "Node[]"),
            ],
        );
        let payload = TypedDataPayload {
            types,
            primary_type: "Node".into(),
            domain: json!({"name": "tree"}),
            message: json!({"value": 1, "children": [{"value": 2, "children": []}]}),
        };
        assert_eq!(
            payload.encode_type("Node").unwrap(),
            "Node(uint256 value,Node[] children)"
        );
        assert!(payload.signing_hash().is_ok());
    }

    #[test]
    fn integer_ranges() {
        assert!(encode_uint(&json!(255), 8, "uint8").is_ok());
        assert!(encode_uint(&json!(256), 8, "uint8").is_err());
        assert!(encode_uint(&json!(-1), 256, "uint256").is_err());
        assert!(encode_int(&json!(-128), 8, "int8").is_ok());
        assert!(encode_int(&json!(-129), 8, "int8").is_err());
        assert!(encode_int(&json!(127), 8, "int8").is_ok());
        assert!(encode_int(&json!(128), 8, "int8").is_err());
        assert!(encode_uint(&json!(1.5), 256, "uint256").is_err());
    }

    #[test]
    fn negative_int_is_twos_complement() {
        assert_eq!(encode_int(&json!(-1), 256, "int256").unwrap(), B256::repeat_byte(0xff));
        assert_eq!(
            encode_int(&json!("-1"), 64, "int64").unwrap(),
            encode_int(&json!(-1), 256, "int256").unwrap()
        );
    }

    #[test]
    fn fixed_bytes_are_right_padded() {
        let mut types = BTreeMap::new();
        types.insert("Tag".to_string(), vec![TypedField::new("t", "bytes4")]);
        let encoder = Encoder {
            types: &types,
            domain_fields: Vec::new(),
        };
        let word = encoder.encode_value("bytes4", &json!("0xdeadbeef")).unwrap();
        assert_eq!(&word[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(word[4..].iter().all(|b| *b == 0));
        assert!(encoder.encode_value("bytes4", &json!("0x0102030405")).is_err());
    }

    #[test]
    fn invalid_json_payload_rejected() {
        assert!(matches!(
            TypedDataPayload::from_json("{\"types\": 3}"),
            Err(KeyringError::TypedDataSchema(_))
        ));
    }
}

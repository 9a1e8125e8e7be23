//! EIP-712 Type Definitions
//!
//! Core data structures for EIP-712 typed data signing.

use crate::utils::crypto::{strip_hex_prefix, to_checksum_address};
use ethers_core::types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Reserved name of the domain struct type
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// 32-byte keccak-256 output
pub type Digest = [u8; 32];

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    /// The name of the field
    pub name: String,
    /// The type of the field (e.g., "address", "uint256", "Person[]")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Struct type definitions keyed by type name.
///
/// Field order inside each type is significant: it is the encoding order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSchema(HashMap<String, Vec<TypedDataField>>);

impl TypeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_type(mut self, type_name: impl Into<String>, fields: Vec<TypedDataField>) -> Self {
        self.insert(type_name, fields);
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, fields: Vec<TypedDataField>) {
        self.0.insert(type_name.into(), fields);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.0.contains_key(type_name)
    }

    /// Declared fields of a struct type
    pub fn fields(&self, type_name: &str) -> Result<&[TypedDataField], Eip712Error> {
        self.0
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| Eip712Error::UnknownType(type_name.to_string()))
    }
}

impl From<HashMap<String, Vec<TypedDataField>>> for TypeSchema {
    fn from(types: HashMap<String, Vec<TypedDataField>>) -> Self {
        Self(types)
    }
}

/// A parsed EIP-712 field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Address,
    Bool,
    /// `uintN`, N in bits
    Uint(usize),
    /// `intN`, N in bits
    Int(usize),
    /// `bytesN`, N in bytes
    FixedBytes(usize),
    Bytes,
    String,
    Struct(String),
    /// `T[k]...[]`: a non-array element and its dimensions in declaration
    /// order, so the outermost dimension is last
    Array {
        element: Box<FieldType>,
        dimensions: Vec<Option<usize>>,
    },
}

impl FieldType {
    /// Parse a declared type against a schema.
    ///
    /// Anything that is neither a primitive nor a declared struct
    /// (including malformed array suffixes) is an unknown type.
    pub fn parse(type_name: &str, schema: &TypeSchema) -> Result<Self, Eip712Error> {
        let unknown = || Eip712Error::UnknownType(type_name.to_string());

        let mut base = type_name;
        let mut dimensions = Vec::new();
        while let Some(stripped) = base.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(unknown)?;
            let length = match &stripped[open + 1..] {
                "" => None,
                digits => Some(parse_decimal(digits).ok_or_else(unknown)?),
            };
            dimensions.push(length);
            base = &stripped[..open];
        }

        let element = match Self::primitive(base) {
            Some(primitive) => primitive,
            None if schema.contains(base) => FieldType::Struct(base.to_string()),
            None => return Err(unknown()),
        };

        if dimensions.is_empty() {
            return Ok(element);
        }
        dimensions.reverse();
        Ok(FieldType::Array {
            element: Box::new(element),
            dimensions,
        })
    }

    /// Parse a primitive (non-struct, non-array) type name
    pub fn primitive(type_name: &str) -> Option<Self> {
        match type_name {
            "address" => Some(FieldType::Address),
            "bool" => Some(FieldType::Bool),
            "string" => Some(FieldType::String),
            "bytes" => Some(FieldType::Bytes),
            _ => {
                if let Some(bits) = type_name.strip_prefix("uint") {
                    parse_bits(bits).map(FieldType::Uint)
                } else if let Some(bits) = type_name.strip_prefix("int") {
                    parse_bits(bits).map(FieldType::Int)
                } else if let Some(size) = type_name.strip_prefix("bytes") {
                    parse_decimal(size)
                        .filter(|n| (1..=32).contains(n))
                        .map(FieldType::FixedBytes)
                } else {
                    None
                }
            }
        }
    }

    /// The struct type this field ultimately refers to, looking through arrays
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            FieldType::Struct(name) => Some(name.as_str()),
            FieldType::Array { element, .. } => element.struct_name(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Address => write!(f, "address"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Uint(bits) => write!(f, "uint{}", bits),
            FieldType::Int(bits) => write!(f, "int{}", bits),
            FieldType::FixedBytes(size) => write!(f, "bytes{}", size),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::String => write!(f, "string"),
            FieldType::Struct(name) => write!(f, "{}", name),
            FieldType::Array { element, dimensions } => {
                write!(f, "{}", element)?;
                for dimension in dimensions {
                    match dimension {
                        Some(n) => write!(f, "[{}]", n)?,
                        None => f.write_str("[]")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Strict decimal parse: digits only, no sign, no leading zero
fn parse_decimal(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

fn parse_bits(bits: &str) -> Option<usize> {
    parse_decimal(bits).filter(|n| *n > 0 && *n <= 256 && n % 8 == 0)
}

/// Check if a type is an atomic (fixed-size) type
pub fn is_atomic_type(type_name: &str) -> bool {
    !is_dynamic_type(type_name) && FieldType::primitive(type_name).is_some()
}

/// Check if a type is a dynamic type
pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

/// A 20-byte Ethereum address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Eip712Error> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| {
            Eip712Error::mismatch("address", format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case representation
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }

    /// Left-padded 32-byte word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = Eip712Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = strip_hex_prefix(s.trim());
        if hex_part.len() != 40 {
            return Err(Eip712Error::mismatch(
                "address",
                format!("expected 40 hex chars, got {}", hex_part.len()),
            ));
        }
        let bytes = hex::decode(hex_part)
            .map_err(|e| Eip712Error::mismatch("address", format!("invalid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The EIP-712 domain values.
///
/// Only the populated fields take part in hashing, and they must match
/// the fields declared by the schema's `EIP712Domain` type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDomain", into = "RawDomain")]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain
    pub name: Option<String>,
    /// The current major version of the signing domain
    pub version: Option<String>,
    /// The EIP-155 chain ID
    pub chain_id: Option<U256>,
    /// The address of the contract that will verify the signature
    pub verifying_contract: Option<Address>,
    /// Disambiguating salt: hex for a `bytes32` declaration, free text for `string`
    pub salt: Option<String>,
}

impl Eip712Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<U256>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_verifying_contract(mut self, contract: Address) -> Self {
        self.verifying_contract = Some(contract);
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// The domain as a struct value for `hash_struct`
    pub fn to_message(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(ref name) = self.name {
            map.insert("name".into(), name.clone().into());
        }
        if let Some(ref version) = self.version {
            map.insert("version".into(), version.clone().into());
        }
        if let Some(chain_id) = self.chain_id {
            map.insert("chainId".into(), chain_id.to_string().into());
        }
        if let Some(contract) = self.verifying_contract {
            map.insert("verifyingContract".into(), contract.to_checksum().into());
        }
        if let Some(ref salt) = self.salt {
            map.insert("salt".into(), salt.clone().into());
        }
        serde_json::Value::Object(map)
    }

    /// Canonical `EIP712Domain` fields for the populated values
    pub fn domain_type(&self) -> Vec<TypedDataField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TypedDataField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedDataField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedDataField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedDataField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedDataField::new("salt", "bytes32"));
        }
        fields
    }
}

/// Wire form of the domain as found in typed-data JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chain_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verifying_contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
}

impl TryFrom<RawDomain> for Eip712Domain {
    type Error = Eip712Error;

    fn try_from(raw: RawDomain) -> Result<Self, Self::Error> {
        let chain_id = match raw.chain_id {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(parse_chain_id(&value)?),
        };
        let verifying_contract = match raw.verifying_contract.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(addr) => Some(addr.parse()?),
        };

        Ok(Self {
            name: raw.name,
            version: raw.version,
            chain_id,
            verifying_contract,
            salt: raw.salt,
        })
    }
}

impl From<Eip712Domain> for RawDomain {
    fn from(domain: Eip712Domain) -> Self {
        let chain_id = domain.chain_id.map(|id| {
            if id <= U256::from(u64::MAX) {
                serde_json::Value::from(id.as_u64())
            } else {
                serde_json::Value::from(id.to_string())
            }
        });

        Self {
            name: domain.name,
            version: domain.version,
            chain_id,
            verifying_contract: domain.verifying_contract.map(|a| a.to_checksum()),
            salt: domain.salt,
        }
    }
}

/// Chain id from a JSON number, decimal string or `0x` hex string
fn parse_chain_id(value: &serde_json::Value) -> Result<U256, Eip712Error> {
    let invalid = || Eip712Error::mismatch("chainId", value.to_string());
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(invalid),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.starts_with("0x") || s.starts_with("0X") {
                U256::from_str_radix(strip_hex_prefix(s), 16).map_err(|_| invalid())
            } else {
                U256::from_dec_str(s).map_err(|_| invalid())
            }
        }
        _ => Err(invalid()),
    }
}

/// Primary type, domain and message: the unit both signer and verifier hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedMessage {
    /// The name of the primary type being signed
    pub primary_type: String,
    /// The EIP-712 domain
    pub domain: Eip712Domain,
    /// The actual message data to sign
    pub message: serde_json::Value,
}

/// Complete EIP-712 typed data document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedData {
    /// Type definitions (struct name -> fields)
    pub types: TypeSchema,

    #[serde(flatten)]
    pub payload: TypedMessage,
}

impl TypedData {
    pub fn new(types: TypeSchema, payload: TypedMessage) -> Self {
        Self { types, payload }
    }

    /// Parse typed data from a JSON string.
    ///
    /// A document without an `EIP712Domain` declaration gets one derived
    /// from the populated domain fields.
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        let mut typed_data: TypedData =
            serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))?;

        if !typed_data.types.contains(EIP712_DOMAIN_TYPE) {
            let fields = typed_data.payload.domain.domain_type();
            typed_data.types.insert(EIP712_DOMAIN_TYPE, fields);
        }

        Ok(typed_data)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, Eip712Error> {
        serde_json::to_string(self).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    pub fn primary_type(&self) -> &str {
        &self.payload.primary_type
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.payload.domain
    }

    pub fn message(&self) -> &serde_json::Value {
        &self.payload.message
    }

    /// Validate the schema up front: primary and domain types exist, and
    /// every type reachable from them resolves without a cycle.
    ///
    /// Declared types that neither root reaches are not checked.
    pub fn validate(&self) -> Result<(), Eip712Error> {
        if !self.types.contains(&self.payload.primary_type) {
            return Err(Eip712Error::UnknownType(self.payload.primary_type.clone()));
        }
        if !self.types.contains(EIP712_DOMAIN_TYPE) {
            return Err(Eip712Error::UnknownType(EIP712_DOMAIN_TYPE.to_string()));
        }

        super::encoder::collect_dependencies(&self.types, &self.payload.primary_type)?;
        super::encoder::collect_dependencies(&self.types, EIP712_DOMAIN_TYPE)?;
        Ok(())
    }
}

/// Errors that can occur during EIP-712 operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Cyclic type reference: {0}")]
    CyclicType(String),

    #[error("Type mismatch for {type_name}: {reason}")]
    TypeMismatch { type_name: String, reason: String },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

impl Eip712Error {
    pub(crate) fn mismatch(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Eip712Error::TypeMismatch {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    fn schema_with_person() -> TypeSchema {
        TypeSchema::new().with_type(
            "Person",
            vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("wallet", "address"),
            ],
        )
    }

    #[test]
    fn test_atomic_types() {
        assert!(is_atomic_type("address"));
        assert!(is_atomic_type("bool"));
        assert!(is_atomic_type("uint256"));
        assert!(is_atomic_type("uint8"));
        assert!(is_atomic_type("int256"));
        assert!(is_atomic_type("bytes32"));
        assert!(is_atomic_type("bytes1"));

        assert!(!is_atomic_type("string"));
        assert!(!is_atomic_type("bytes"));
        assert!(!is_atomic_type("uint"));
        assert!(!is_atomic_type("uint257"));
        assert!(!is_atomic_type("uint7"));
        assert!(!is_atomic_type("uint+8"));
        assert!(!is_atomic_type("uint08"));
        assert!(!is_atomic_type("bytes33"));
        assert!(!is_atomic_type("bytes0"));
    }

    #[test]
    fn test_dynamic_types() {
        assert!(is_dynamic_type("bytes"));
        assert!(is_dynamic_type("string"));

        assert!(!is_dynamic_type("bytes32"));
        assert!(!is_dynamic_type("address"));
    }

    #[test]
    fn test_parse_nested_arrays() {
        let schema = schema_with_person();
        let parsed = FieldType::parse("Person[2][]", &schema).unwrap();
        assert_eq!(
            parsed,
            FieldType::Array {
                element: Box::new(FieldType::Struct("Person".into())),
                dimensions: vec![Some(2), None],
            }
        );
        assert_eq!(parsed.struct_name(), Some("Person"));
        assert_eq!(parsed.to_string(), "Person[2][]");
    }

    #[test]
    fn test_parse_deep_array_suffix() {
        let type_name = format!("uint256{}", "[]".repeat(200_000));
        let parsed = FieldType::parse(&type_name, &TypeSchema::new()).unwrap();
        match &parsed {
            FieldType::Array { element, dimensions } => {
                assert_eq!(**element, FieldType::Uint(256));
                assert_eq!(dimensions.len(), 200_000);
            }
            other => panic!("expected an array type, got {:?}", other),
        }
        assert_eq!(parsed.to_string(), type_name);
    }

    #[test]
    fn test_parse_rejects_unknown_types() {
        let schema = schema_with_person();
        assert!(matches!(
            FieldType::parse("Animal", &schema),
            Err(Eip712Error::UnknownType(_))
        ));
        assert!(matches!(
            FieldType::parse("uint256[x]", &schema),
            Err(Eip712Error::UnknownType(_))
        ));
        assert!(matches!(
            FieldType::parse("uint256]", &schema),
            Err(Eip712Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_address_parse_and_display() {
        let addr: Address = "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826".parse().unwrap();
        assert_eq!(addr.to_string(), "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826");
        assert_eq!(&addr.to_word()[..12], &[0u8; 12]);

        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(Eip712Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            "0xzz2a3d9f938e13cd947ec05abc7fe734df8dd826".parse::<Address>(),
            Err(Eip712Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_chain_id_parsing() {
        let numeric: Eip712Domain =
            serde_json::from_value(serde_json::json!({"chainId": 1})).unwrap();
        assert_eq!(numeric.chain_id, Some(U256::from(1u64)));

        let decimal: Eip712Domain =
            serde_json::from_value(serde_json::json!({"chainId": "2494104990"})).unwrap();
        assert_eq!(decimal.chain_id, Some(U256::from(2_494_104_990u64)));

        let hex: Eip712Domain =
            serde_json::from_value(serde_json::json!({"chainId": "0x89"})).unwrap();
        assert_eq!(hex.chain_id, Some(U256::from(137u64)));

        let bad = serde_json::from_value::<Eip712Domain>(serde_json::json!({"chainId": true}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_empty_verifying_contract_is_absent() {
        let domain: Eip712Domain = serde_json::from_value(serde_json::json!({
            "name": "ETHChallenger",
            "verifyingContract": ""
        }))
        .unwrap();
        assert_eq!(domain.verifying_contract, None);
        assert_eq!(domain.domain_type(), vec![TypedDataField::new("name", "string")]);
    }

    #[test]
    fn test_domain_json_roundtrip() {
        let domain = Eip712Domain::new()
            .with_name("Demo")
            .with_version("1.0")
            .with_chain_id(1u64)
            .with_verifying_contract(Address([0xcc; 20]));

        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(json["chainId"], serde_json::json!(1));
        let back: Eip712Domain = serde_json::from_value(json).unwrap();
        assert_eq!(back, domain);
    }

    #[test]
    fn test_missing_domain_type_is_derived() {
        let json = r#"{
            "types": {"Ping": [{"name": "id", "type": "uint256"}]},
            "primaryType": "Ping",
            "domain": {"name": "Test", "chainId": 5},
            "message": {"id": 1}
        }"#;
        let typed_data = TypedData::from_json(json).unwrap();
        assert_eq!(
            typed_data.types.fields(EIP712_DOMAIN_TYPE).unwrap(),
            &[
                TypedDataField::new("name", "string"),
                TypedDataField::new("chainId", "uint256"),
            ]
        );
        typed_data.validate().unwrap();
    }
}

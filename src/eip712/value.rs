//! Schema-validated typed values
//!
//! Loose JSON message data is converted against the schema into a
//! [`TypedValue`] tree before anything is encoded. Every node carries
//! its declared kind, so encoding dispatches on the tag alone.

use super::encoder::type_hash;
use super::types::*;
use crate::utils::crypto::{keccak256, strip_hex_prefix};
use ethers_core::types::U256;
use serde_json::Value;

/// A message value tagged with its EIP-712 kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Address(Address),
    Bool(bool),
    Uint(U256),
    /// Two's complement, sign-extended to 256 bits
    Int(U256),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Struct {
        type_name: String,
        fields: Vec<(String, TypedValue)>,
    },
    Array(Vec<TypedValue>),
}

impl TypedValue {
    /// Convert a JSON value to the declared type
    pub fn from_json(
        schema: &TypeSchema,
        field_type: &FieldType,
        value: &Value,
    ) -> Result<Self, Eip712Error> {
        let mismatch = |reason: String| Eip712Error::mismatch(field_type.to_string(), reason);

        match field_type {
            FieldType::Address => {
                let s = value
                    .as_str()
                    .ok_or_else(|| mismatch(format!("expected a hex string, got {}", value)))?;
                Ok(TypedValue::Address(s.parse()?))
            }
            FieldType::Bool => match value {
                Value::Bool(b) => Ok(TypedValue::Bool(*b)),
                Value::String(s) if s == "true" => Ok(TypedValue::Bool(true)),
                Value::String(s) if s == "false" => Ok(TypedValue::Bool(false)),
                _ => Err(mismatch(format!("expected a boolean, got {}", value))),
            },
            FieldType::Uint(bits) => parse_uint(value, *bits).map(TypedValue::Uint),
            FieldType::Int(bits) => parse_int(value, *bits).map(TypedValue::Int),
            FieldType::FixedBytes(size) => {
                let bytes = parse_hex_value(value).map_err(mismatch)?;
                if bytes.len() != *size {
                    return Err(mismatch(format!(
                        "expected {} bytes, got {}",
                        size,
                        bytes.len()
                    )));
                }
                Ok(TypedValue::FixedBytes(bytes))
            }
            FieldType::Bytes => parse_hex_value(value).map(TypedValue::Bytes).map_err(mismatch),
            FieldType::String => value
                .as_str()
                .map(|s| TypedValue::String(s.to_string()))
                .ok_or_else(|| mismatch(format!("expected a string, got {}", value))),
            FieldType::Struct(type_name) => Self::from_struct_json(schema, type_name, value),
            FieldType::Array { element, dimensions } => {
                Self::array_from_json(schema, field_type, element, dimensions, value)
            }
        }
    }

    /// Convert one array dimension, outermost last in `dimensions`.
    ///
    /// Recursion follows the nesting of the JSON value, not of the type.
    fn array_from_json(
        schema: &TypeSchema,
        field_type: &FieldType,
        element: &FieldType,
        dimensions: &[Option<usize>],
        value: &Value,
    ) -> Result<Self, Eip712Error> {
        let Some((outer, inner)) = dimensions.split_last() else {
            return Self::from_json(schema, element, value);
        };
        let mismatch = |reason: String| Eip712Error::mismatch(field_type.to_string(), reason);

        let items = value
            .as_array()
            .ok_or_else(|| mismatch(format!("expected an array, got {}", value)))?;
        if let Some(expected) = outer {
            if items.len() != *expected {
                return Err(mismatch(format!(
                    "expected {} elements, got {}",
                    expected,
                    items.len()
                )));
            }
        }
        items
            .iter()
            .map(|item| Self::array_from_json(schema, field_type, element, inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(TypedValue::Array)
    }

    /// Convert a JSON object to a struct value.
    ///
    /// Every declared field must be present and no undeclared field may be.
    pub fn from_struct_json(
        schema: &TypeSchema,
        type_name: &str,
        value: &Value,
    ) -> Result<Self, Eip712Error> {
        let declared = schema.fields(type_name)?;
        let obj = value.as_object().ok_or_else(|| {
            Eip712Error::mismatch(type_name, format!("expected an object, got {}", value))
        })?;

        let mut fields = Vec::with_capacity(declared.len());
        for field in declared {
            let raw = obj.get(&field.name).ok_or_else(|| {
                Eip712Error::mismatch(type_name, format!("missing field `{}`", field.name))
            })?;
            let field_type = FieldType::parse(&field.type_name, schema)?;
            let typed = Self::from_json(schema, &field_type, raw)?;
            fields.push((field.name.clone(), typed));
        }

        if let Some(extra) = obj
            .keys()
            .find(|key| !declared.iter().any(|field| &field.name == *key))
        {
            return Err(Eip712Error::mismatch(
                type_name,
                format!("undeclared field `{}`", extra),
            ));
        }

        Ok(TypedValue::Struct {
            type_name: type_name.to_string(),
            fields,
        })
    }

    /// The 32-byte word this value contributes to its parent's encoding
    pub fn encode_word(&self, schema: &TypeSchema) -> Result<[u8; 32], Eip712Error> {
        let mut word = [0u8; 32];
        match self {
            TypedValue::Address(address) => return Ok(address.to_word()),
            TypedValue::Bool(b) => word[31] = u8::from(*b),
            TypedValue::Uint(n) | TypedValue::Int(n) => n.to_big_endian(&mut word),
            TypedValue::FixedBytes(bytes) => word[..bytes.len()].copy_from_slice(bytes),
            TypedValue::Bytes(bytes) => return Ok(keccak256(bytes)),
            TypedValue::String(s) => return Ok(keccak256(s.as_bytes())),
            TypedValue::Struct { .. } => return self.struct_hash(schema),
            TypedValue::Array(items) => {
                let mut buf = Vec::with_capacity(items.len() * 32);
                for item in items {
                    buf.extend_from_slice(&item.encode_word(schema)?);
                }
                return Ok(keccak256(&buf));
            }
        }
        Ok(word)
    }

    /// `typeHash || word(field_1) || ... || word(field_n)` of a struct value
    pub fn encode_data(&self, schema: &TypeSchema) -> Result<Vec<u8>, Eip712Error> {
        let TypedValue::Struct { type_name, fields } = self else {
            return Err(Eip712Error::mismatch(
                "struct",
                format!("{:?} is not a struct value", self),
            ));
        };

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(&type_hash(schema, type_name)?);
        for (_, value) in fields {
            encoded.extend_from_slice(&value.encode_word(schema)?);
        }
        Ok(encoded)
    }

    /// keccak256 of [`encode_data`](Self::encode_data)
    pub fn struct_hash(&self, schema: &TypeSchema) -> Result<Digest, Eip712Error> {
        Ok(keccak256(&self.encode_data(schema)?))
    }
}

fn parse_hex_value(value: &Value) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected a hex string, got {}", value))?;
    hex::decode(strip_hex_prefix(s.trim())).map_err(|e| format!("invalid hex: {}", e))
}

/// Unsigned magnitude from a decimal or `0x` hex string
fn parse_unsigned_str(s: &str) -> Option<U256> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() {
            return None;
        }
        U256::from_str_radix(digits, 16).ok()
    } else {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_dec_str(s).ok()
    }
}

fn parse_uint(value: &Value, bits: usize) -> Result<U256, Eip712Error> {
    let type_name = format!("uint{}", bits);
    let n = match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => parse_unsigned_str(s),
        _ => None,
    }
    .ok_or_else(|| {
        Eip712Error::mismatch(&type_name, format!("{} is not an unsigned integer", value))
    })?;

    if n.bits() > bits {
        return Err(Eip712Error::mismatch(
            &type_name,
            format!("{} does not fit in {} bits", n, bits),
        ));
    }
    Ok(n)
}

fn parse_int(value: &Value, bits: usize) -> Result<U256, Eip712Error> {
    let type_name = format!("int{}", bits);
    let parsed = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => Some((false, U256::from(u))),
            (None, Some(i)) => Some((i < 0, U256::from(i.unsigned_abs()))),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix('-') {
                Some(rest) => parse_unsigned_str(rest).map(|m| (true, m)),
                None => parse_unsigned_str(s).map(|m| (false, m)),
            }
        }
        _ => None,
    };
    let (negative, magnitude) = parsed.ok_or_else(|| {
        Eip712Error::mismatch(&type_name, format!("{} is not an integer", value))
    })?;

    // Valid range is [-2^(bits-1), 2^(bits-1) - 1]
    let limit = U256::one() << (bits - 1);
    let in_range = if negative { magnitude <= limit } else { magnitude < limit };
    if !in_range {
        return Err(Eip712Error::mismatch(
            &type_name,
            format!("{} does not fit in {} bits", value, bits),
        ));
    }

    if negative && !magnitude.is_zero() {
        Ok((!magnitude).overflowing_add(U256::one()).0)
    } else {
        Ok(magnitude)
    }
}

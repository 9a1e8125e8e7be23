//! EIP-712 Hashing
//!
//! Implements domain separator and final digest calculation for EIP-712.

use super::encoder::hash_struct;
use super::types::*;
use crate::log_debug;
use crate::utils::crypto::keccak256_concat;

/// Magic prefix for EIP-712 encoding
pub const EIP712_PREFIX: &[u8] = b"\x19\x01";

/// Calculate the domain separator hash
///
/// domainSeparator = hashStruct(eip712Domain)
///
/// The domain values must match the schema's `EIP712Domain` declaration
/// field for field.
pub fn domain_separator(schema: &TypeSchema, domain: &Eip712Domain) -> Result<Digest, Eip712Error> {
    hash_struct(schema, EIP712_DOMAIN_TYPE, &domain.to_message())
}

/// Calculate the final EIP-712 digest for a message
///
/// digest = keccak256("\x19\x01" || domainSeparator || hashStruct(message))
pub fn digest(schema: &TypeSchema, typed_message: &TypedMessage) -> Result<Digest, Eip712Error> {
    Ok(pre_image(schema, typed_message)?.final_hash)
}

/// Validate a typed-data document and calculate its digest
pub fn hash_typed_data(typed_data: &TypedData) -> Result<Digest, Eip712Error> {
    Ok(get_pre_image(typed_data)?.final_hash)
}

/// The intermediate hashes behind a digest (for external signing and debugging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: Digest,
    pub struct_hash: Digest,
    pub final_hash: Digest,
}

impl Eip712PreImage {
    /// The 66 bytes that are hashed into `final_hash`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(2 + 32 + 32);
        data.extend_from_slice(EIP712_PREFIX);
        data.extend_from_slice(&self.domain_separator);
        data.extend_from_slice(&self.struct_hash);
        data
    }
}

fn pre_image(
    schema: &TypeSchema,
    typed_message: &TypedMessage,
) -> Result<Eip712PreImage, Eip712Error> {
    let domain_separator = domain_separator(schema, &typed_message.domain)?;
    let struct_hash = hash_struct(schema, &typed_message.primary_type, &typed_message.message)?;
    let final_hash = keccak256_concat(&[EIP712_PREFIX, &domain_separator, &struct_hash]);

    log_debug!(
        "eip712",
        "Computed typed data digest",
        primary_type = typed_message.primary_type,
        domain_separator = hex::encode(domain_separator),
        struct_hash = hex::encode(struct_hash),
        digest = hex::encode(final_hash),
    );

    Ok(Eip712PreImage {
        domain_separator,
        struct_hash,
        final_hash,
    })
}

/// Calculate the pre-image components for EIP-712
pub fn get_pre_image(typed_data: &TypedData) -> Result<Eip712PreImage, Eip712Error> {
    typed_data.validate()?;
    pre_image(&typed_data.types, &typed_data.payload)
}

impl TypedData {
    /// The EIP-712 digest of this document
    pub fn encode_hash(&self) -> Result<Digest, Eip712Error> {
        hash_typed_data(self)
    }

    /// The domain separator of this document
    pub fn domain_separator(&self) -> Result<Digest, Eip712Error> {
        self.validate()?;
        domain_separator(&self.types, self.domain())
    }

    /// The struct hash of the primary message
    pub fn struct_hash(&self) -> Result<Digest, Eip712Error> {
        self.validate()?;
        hash_struct(&self.types, self.primary_type(), self.message())
    }
}

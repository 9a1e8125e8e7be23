//! Ethereum Personal Message Signing (EIP-191)
//!
//! Implements personal_sign on top of the typed-data signing engine.
//! Reference: https://eips.ethereum.org/EIPS/eip-191
//!
//! Format: "\x19Ethereum Signed Message:\n" + len(message) + message

use super::{MessageSignError, MessageSignResult};
use crate::eip712::{self, Address, Digest, Eip712Signature, RecoveryIdConvention};
use crate::utils::crypto::{keccak256_concat, strip_hex_prefix};

/// Ethereum message prefix for personal_sign
const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Hash a message with the Ethereum personal sign prefix
///
/// # Arguments
/// * `message` - The raw message bytes
///
/// # Returns
/// The keccak256 hash of the prefixed message
pub fn personal_message_hash(message: &[u8]) -> Digest {
    let prefix = format!("{}{}", ETH_MESSAGE_PREFIX, message.len());
    keccak256_concat(&[prefix.as_bytes(), message])
}

/// Sign a message using Ethereum personal_sign
///
/// # Arguments
/// * `message` - The raw message to sign (UTF-8 string or raw bytes)
/// * `private_key` - 32-byte private key
/// * `convention` - How the recovery byte is written
pub fn personal_sign(
    message: &[u8],
    private_key: &[u8],
    convention: RecoveryIdConvention,
) -> MessageSignResult<Eip712Signature> {
    let hash = personal_message_hash(message);
    Ok(eip712::sign_hash(private_key, &hash, convention)?)
}

/// Sign a hex-encoded message
pub fn personal_sign_hex(
    hex_message: &str,
    private_key: &[u8],
    convention: RecoveryIdConvention,
) -> MessageSignResult<Eip712Signature> {
    let message = decode_hex_message(hex_message)?;
    personal_sign(&message, private_key, convention)
}

/// Recover the signer's address from a signed message
pub fn recover_personal_signer(
    message: &[u8],
    signature: &Eip712Signature,
) -> MessageSignResult<Address> {
    let hash = personal_message_hash(message);
    Ok(eip712::recover_address(&hash, signature)?)
}

/// Verify an Ethereum personal_sign signature
///
/// Returns false when the signature recovers a different address.
pub fn verify_personal_signature(
    message: &[u8],
    signature: &Eip712Signature,
    expected: &Address,
) -> MessageSignResult<bool> {
    Ok(recover_personal_signer(message, signature)? == *expected)
}

/// Decode a `0x`-prefixed hex message
pub fn decode_hex_message(hex_message: &str) -> MessageSignResult<Vec<u8>> {
    hex::decode(strip_hex_prefix(hex_message.trim()))
        .map_err(|e| MessageSignError::InvalidMessage(format!("Invalid hex: {}", e)))
}

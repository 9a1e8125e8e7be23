//! EIP-712 Signing
//!
//! ECDSA signing and address recovery for EIP-712 digests.

use super::hasher::hash_typed_data;
use super::signature::{Eip712Signature, RecoveryIdConvention};
use super::types::*;
use crate::log_debug;
use crate::utils::crypto::{keccak256, strip_hex_prefix};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{constants::CURVE_ORDER, Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

/// Sign EIP-712 typed data
///
/// Returns a signature with v, r, s components.
pub fn sign_typed_data(
    typed_data: &TypedData,
    private_key: &[u8],
    convention: RecoveryIdConvention,
) -> Result<Eip712Signature, Eip712Error> {
    let hash = hash_typed_data(typed_data)?;
    sign_hash(private_key, &hash, convention)
}

/// Sign a pre-computed digest.
///
/// Nonces are deterministic (RFC 6979), so the same key and digest always
/// give the same signature. `s` is kept in the lower half of the order.
pub fn sign_hash(
    private_key: &[u8],
    digest: &Digest,
    convention: RecoveryIdConvention,
) -> Result<Eip712Signature, Eip712Error> {
    let secret_key = parse_secret_key(private_key)?;

    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    let recoverable = secp.sign_ecdsa_recoverable(&message, &secret_key);
    let (recovery_id, _) = recoverable.serialize_compact();
    let mut parity = recovery_id_to_parity(recovery_id)?;

    let standard = recoverable.to_standard();
    let mut normalized = standard;
    normalized.normalize_s();
    if normalized != standard {
        parity ^= 1;
    }
    let compact = normalized.serialize_compact();

    // Confirm the parity by recovering the key we signed with
    let parity = [parity, parity ^ 1]
        .into_iter()
        .find(|candidate| {
            recover_public_key(&secp, &message, &compact, *candidate)
                .map(|recovered| recovered == public_key)
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            Eip712Error::SigningFailed("no recovery id reproduces the signer".to_string())
        })?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[0..32]);
    s.copy_from_slice(&compact[32..64]);

    let signature = Eip712Signature::new(r, s, convention.encode(parity));

    log_debug!(
        "eip712",
        "Signed digest",
        digest = hex::encode(digest),
        signer = public_key_to_address(&public_key),
        v = signature.v,
    );

    Ok(signature)
}

/// Verify an EIP-712 signature
///
/// Returns true if the signature was produced by `expected`.
pub fn verify_typed_data(
    typed_data: &TypedData,
    signature: &Eip712Signature,
    expected: &Address,
) -> Result<bool, Eip712Error> {
    let hash = hash_typed_data(typed_data)?;
    verify_signature(&hash, signature, expected)
}

/// Verify a signature against a digest and expected address
pub fn verify_signature(
    digest: &Digest,
    signature: &Eip712Signature,
    expected: &Address,
) -> Result<bool, Eip712Error> {
    let recovered = recover_address(digest, signature)?;
    Ok(recovered == *expected)
}

/// Recover the signer of EIP-712 typed data
pub fn recover_typed_data(
    typed_data: &TypedData,
    signature: &Eip712Signature,
) -> Result<Address, Eip712Error> {
    let hash = hash_typed_data(typed_data)?;
    recover_address(&hash, signature)
}

/// Recover the signer's address from a signature.
///
/// Accepts `v` as 27/28 or 0/1. High-`s` signatures recover the same way
/// `ecrecover` does; use [`Eip712Signature::is_low_s`] to reject them.
pub fn recover_address(
    digest: &Digest,
    signature: &Eip712Signature,
) -> Result<Address, Eip712Error> {
    let parity = signature.parity()?;
    check_scalar("r", &signature.r)?;
    check_scalar("s", &signature.s)?;

    let mut compact = [0u8; 64];
    compact[0..32].copy_from_slice(&signature.r);
    compact[32..64].copy_from_slice(&signature.s);

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);
    let public_key = recover_public_key(&secp, &message, &compact, parity)?;

    Ok(public_key_to_address(&public_key))
}

/// Derive the Ethereum address controlled by a private key
pub fn address_from_private_key(private_key: &[u8]) -> Result<Address, Eip712Error> {
    let secret_key = parse_secret_key(private_key)?;
    let secp = Secp256k1::signing_only();
    Ok(public_key_to_address(&PublicKey::from_secret_key(&secp, &secret_key)))
}

/// Decode a hex private key into a buffer that is wiped on drop
pub fn decode_private_key(key_hex: &str) -> Result<Zeroizing<Vec<u8>>, Eip712Error> {
    let bytes = hex::decode(strip_hex_prefix(key_hex.trim()))
        .map_err(|_| Eip712Error::InvalidKey("private key is not valid hex".to_string()))?;
    let bytes = Zeroizing::new(bytes);
    if bytes.len() != 32 {
        return Err(Eip712Error::InvalidKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn parse_secret_key(private_key: &[u8]) -> Result<SecretKey, Eip712Error> {
    if private_key.len() != 32 {
        return Err(Eip712Error::InvalidKey(format!(
            "expected 32 bytes, got {}",
            private_key.len()
        )));
    }
    SecretKey::from_slice(private_key)
        .map_err(|_| Eip712Error::InvalidKey("private key is outside the curve order".to_string()))
}

/// Reject scalars that are zero or not below the curve order
fn check_scalar(name: &str, scalar: &[u8; 32]) -> Result<(), Eip712Error> {
    if scalar.iter().all(|b| *b == 0) {
        return Err(Eip712Error::InvalidSignature(format!("{} is zero", name)));
    }
    if *scalar >= CURVE_ORDER {
        return Err(Eip712Error::InvalidSignature(format!(
            "{} is not below the curve order",
            name
        )));
    }
    Ok(())
}

fn recovery_id_to_parity(recovery_id: RecoveryId) -> Result<u8, Eip712Error> {
    match recovery_id.to_i32() {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(Eip712Error::SigningFailed(format!(
            "unsupported recovery id {}",
            other
        ))),
    }
}

fn recover_public_key<C: secp256k1::Verification>(
    secp: &Secp256k1<C>,
    message: &Message,
    compact: &[u8; 64],
    parity: u8,
) -> Result<PublicKey, Eip712Error> {
    let recovery_id = RecoveryId::from_i32(i32::from(parity))
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(compact, recovery_id)
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;
    secp.recover_ecdsa(message, &recoverable)
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))
}

/// Convert a secp256k1 public key to an Ethereum address
pub(crate) fn public_key_to_address(public_key: &PublicKey) -> Address {
    // Uncompressed key is 0x04 || X || Y; the address hashes X || Y
    let pubkey_bytes = public_key.serialize_uncompressed();
    let hash = keccak256(&pubkey_bytes[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    Address(address)
}

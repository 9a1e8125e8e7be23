//! typed-signer
//!
//! EIP-712 typed structured data hashing, secp256k1 signing and signer
//! recovery.
//!
//! # Architecture
//!
//! This crate provides:
//! - **eip712**: type encoding, struct hashing, domain separation, signing
//!   and recovery
//! - **message_signer**: EIP-191 personal messages on the same engine
//! - **verifier**: cross-checking signatures against an on-chain verifier
//!   contract through a caller-supplied [`verifier::ContractCaller`]
//! - **utils**: keccak, checksum addresses and structured logging
//!
//! # Security
//!
//! Decoded private keys are held in `zeroize::Zeroizing` buffers and never
//! logged; the logger redacts key material by field name.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_signer::eip712::{self, RecoveryIdConvention, TypedData};
//!
//! let typed_data = TypedData::from_json(&json)?;
//! let convention = RecoveryIdConvention::Legacy;
//! let signature = eip712::sign_typed_data(&typed_data, &private_key, convention)?;
//! let signer = eip712::recover_typed_data(&typed_data, &signature)?;
//! ```

pub mod eip712;
pub mod error;
pub mod message_signer;
pub mod utils;
pub mod verifier;

pub use eip712::{
    Address, Digest, Eip712Domain, Eip712Error, Eip712Signature, RecoveryIdConvention, TypeSchema,
    TypedData, TypedDataField, TypedMessage,
};
pub use error::{ErrorCode, SignerError, SignerResult};
pub use utils::crypto::{keccak256, to_checksum_address};

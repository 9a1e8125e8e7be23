//! EIP-712 Typed Data Signing
//!
//! Implementation of EIP-712 typed structured data hashing, signing and
//! signer recovery.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use typed_signer::eip712::{TypedData, RecoveryIdConvention, sign_hash, recover_address};
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let hash = typed_data.encode_hash()?;
//! let signature = sign_hash(&private_key, &hash, RecoveryIdConvention::Legacy)?;
//! let signer = recover_address(&hash, &signature)?;
//! ```

pub mod types;
pub mod value;
pub mod encoder;
pub mod hasher;
pub mod signature;
pub mod signer;

pub use types::*;
pub use value::*;
pub use encoder::*;
pub use hasher::*;
pub use signature::*;
pub use signer::*;

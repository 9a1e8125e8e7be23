//! Message Signing Module
//!
//! Personal message signing next to typed data. Only the Ethereum
//! EIP-191 format is supported.

pub mod ethereum;

pub use ethereum::{
    personal_message_hash, personal_sign, personal_sign_hex, recover_personal_signer,
    verify_personal_signature,
};

use crate::eip712::Eip712Error;

/// Message signing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageSignError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Signing(#[from] Eip712Error),
}

pub type MessageSignResult<T> = Result<T, MessageSignError>;

//! Unified error types for typed-signer
//!
//! Library modules return their own `thiserror` enums; this module maps
//! them onto one serializable shape for JSON-facing surfaces.

use crate::eip712::Eip712Error;
use crate::message_signer::MessageSignError;
use crate::verifier::VerifierError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable error for all typed-signer operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidJson,
    UnknownType,
    CyclicType,
    TypeMismatch,
    InvalidPrivateKey,
    InvalidSignature,

    // Crypto errors
    SigningFailed,

    // Contract verification errors
    ContractCallFailed,
    DecodeError,
    ChainIdMismatch,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for typed-signer operations
pub type SignerResult<T> = Result<T, SignerError>;

impl From<Eip712Error> for SignerError {
    fn from(e: Eip712Error) -> Self {
        let code = match e {
            Eip712Error::InvalidJson(_) => ErrorCode::InvalidJson,
            Eip712Error::UnknownType(_) => ErrorCode::UnknownType,
            Eip712Error::CyclicType(_) => ErrorCode::CyclicType,
            Eip712Error::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Eip712Error::InvalidKey(_) => ErrorCode::InvalidPrivateKey,
            Eip712Error::InvalidSignature(_) => ErrorCode::InvalidSignature,
            Eip712Error::SigningFailed(_) => ErrorCode::SigningFailed,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<VerifierError> for SignerError {
    fn from(e: VerifierError) -> Self {
        match e {
            VerifierError::Transport(_) => {
                SignerError::new(ErrorCode::ContractCallFailed, e.to_string())
            }
            VerifierError::Decode(_) => SignerError::new(ErrorCode::DecodeError, e.to_string()),
            VerifierError::ChainIdMismatch { .. } => {
                SignerError::new(ErrorCode::ChainIdMismatch, e.to_string())
            }
            VerifierError::Eip712(inner) => inner.into(),
        }
    }
}

impl From<MessageSignError> for SignerError {
    fn from(e: MessageSignError) -> Self {
        match e {
            MessageSignError::InvalidMessage(msg) => SignerError::invalid_input(msg),
            MessageSignError::Signing(inner) => inner.into(),
        }
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for SignerError {
    fn from(e: std::io::Error) -> Self {
        SignerError::new(ErrorCode::Internal, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = SignerError::from(Eip712Error::CyclicType("A -> B -> A".to_string()))
            .with_details("while hashing Order");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"cyclic_type\""));
        assert!(json.contains("A -> B -> A"));
        assert!(json.contains("while hashing Order"));
    }

    #[test]
    fn test_verifier_errors_unwrap_eip712() {
        let err: SignerError =
            VerifierError::Eip712(Eip712Error::InvalidKey("short".into())).into();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);

        let err: SignerError = VerifierError::Transport("timeout".into()).into();
        assert_eq!(err.code, ErrorCode::ContractCallFailed);
    }

    #[test]
    fn test_display() {
        let err = SignerError::invalid_input("missing file");
        assert_eq!(err.to_string(), "[InvalidInput] missing file");
    }
}

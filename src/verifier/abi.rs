//! Calldata for the on-chain verifier contract
//!
//! The contract exposes:
//! - `verify(address from, address to, uint256 value, bytes signature) returns (bool)`
//! - `getChainId() returns (uint256)`

use super::VerifierError;
use crate::eip712::{Address, Eip712Signature};
use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{H160, U256};
use ethers_core::utils::id;

pub const VERIFY_SIGNATURE: &str = "verify(address,address,uint256,bytes)";
pub const GET_CHAIN_ID_SIGNATURE: &str = "getChainId()";

/// Helper to create verifier calldata
pub struct FunctionCall;

impl FunctionCall {
    /// `verify(from, to, value, signature)` calldata
    pub fn verify(
        from: &Address,
        to: &Address,
        value: U256,
        signature: &Eip712Signature,
    ) -> Vec<u8> {
        let mut calldata = id(VERIFY_SIGNATURE).to_vec();
        calldata.extend(encode(&[
            Token::Address(H160::from(from.0)),
            Token::Address(H160::from(to.0)),
            Token::Uint(value),
            Token::Bytes(signature.to_bytes().to_vec()),
        ]));
        calldata
    }

    /// `getChainId()` calldata
    pub fn get_chain_id() -> Vec<u8> {
        id(GET_CHAIN_ID_SIGNATURE).to_vec()
    }
}

/// Verifier contract result decoders
pub struct FunctionResult;

impl FunctionResult {
    /// Decode a single `bool` return value
    pub fn bool(data: &[u8]) -> Result<bool, VerifierError> {
        match decode(&[ParamType::Bool], data)
            .map_err(|e| VerifierError::Decode(e.to_string()))?
            .first()
        {
            Some(Token::Bool(value)) => Ok(*value),
            _ => Err(VerifierError::Decode("expected bool".to_string())),
        }
    }

    /// Decode a single `uint256` return value
    pub fn uint256(data: &[u8]) -> Result<U256, VerifierError> {
        match decode(&[ParamType::Uint(256)], data)
            .map_err(|e| VerifierError::Decode(e.to_string()))?
            .first()
        {
            Some(Token::Uint(value)) => Ok(*value),
            _ => Err(VerifierError::Decode("expected uint256".to_string())),
        }
    }
}

/// Arguments of a `verify` call, decoded from calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyArgs {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub signature: Vec<u8>,
}

/// Decode `verify` calldata (selector included)
pub fn decode_verify_call(calldata: &[u8]) -> Result<VerifyArgs, VerifierError> {
    let selector = id(VERIFY_SIGNATURE);
    let body = calldata
        .strip_prefix(selector.as_slice())
        .ok_or_else(|| VerifierError::Decode("not a verify call".to_string()))?;

    let tokens = decode(
        &[
            ParamType::Address,
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Bytes,
        ],
        body,
    )
    .map_err(|e| VerifierError::Decode(e.to_string()))?;

    match tokens.as_slice() {
        [Token::Address(from), Token::Address(to), Token::Uint(value), Token::Bytes(signature)] => {
            Ok(VerifyArgs {
                from: Address(from.0),
                to: Address(to.0),
                value: *value,
                signature: signature.clone(),
            })
        }
        _ => Err(VerifierError::Decode("unexpected verify arguments".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_selectors() {
        assert_eq!(FunctionCall::get_chain_id(), id("getChainId()").to_vec());
        assert_eq!(FunctionCall::get_chain_id().len(), 4);
    }

    #[test]
    fn test_verify_calldata_layout() {
        let sig = Eip712Signature::new([0x11; 32], [0x22; 32], 27);
        let calldata = FunctionCall::verify(&addr(0xaa), &addr(0xbb), U256::from(12345u64), &sig);

        // selector, 4 head words, length word, 65 bytes padded to 96
        assert_eq!(calldata.len(), 4 + 4 * 32 + 32 + 96);
        assert_eq!(&calldata[..4], &id(VERIFY_SIGNATURE));
        assert_eq!(&calldata[4 + 12..4 + 32], &[0xaau8; 20]);
        assert_eq!(&calldata[36 + 12..36 + 32], &[0xbbu8; 20]);
        assert_eq!(U256::from_big_endian(&calldata[68..100]), U256::from(12345u64));
        // offset of the dynamic bytes argument
        assert_eq!(U256::from_big_endian(&calldata[100..132]), U256::from(128u64));
        assert_eq!(U256::from_big_endian(&calldata[132..164]), U256::from(65u64));
        assert_eq!(&calldata[164..229], &sig.to_bytes());
    }

    #[test]
    fn test_decode_verify_call() {
        let sig = Eip712Signature::new([0x11; 32], [0x22; 32], 28);
        let calldata = FunctionCall::verify(&addr(1), &addr(2), U256::from(7u64), &sig);

        let args = decode_verify_call(&calldata).unwrap();
        assert_eq!(args.from, addr(1));
        assert_eq!(args.to, addr(2));
        assert_eq!(args.value, U256::from(7u64));
        assert_eq!(args.signature, sig.to_bytes().to_vec());

        assert!(decode_verify_call(&FunctionCall::get_chain_id()).is_err());
    }

    #[test]
    fn test_decode_results() {
        assert!(FunctionResult::bool(&encode(&[Token::Bool(true)])).unwrap());
        assert!(!FunctionResult::bool(&encode(&[Token::Bool(false)])).unwrap());
        assert_eq!(
            FunctionResult::uint256(&encode(&[Token::Uint(U256::from(31337u64))])).unwrap(),
            U256::from(31337u64)
        );
        assert!(matches!(FunctionResult::bool(&[]), Err(VerifierError::Decode(_))));
    }
}

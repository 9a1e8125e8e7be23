//! On-chain Signature Verification
//!
//! Checks a typed-data signature against a deployed verifier contract and
//! compares the contract's verdict with local recovery. The contract call
//! itself is delegated to a [`ContractCaller`] supplied by the caller, so
//! this module performs no I/O of its own.

pub mod abi;

pub use abi::{decode_verify_call, FunctionCall, FunctionResult, VerifyArgs};

use crate::eip712::{
    self, Address, Digest, Eip712Error, Eip712Signature, FieldType, TypeSchema, TypedData,
    TypedValue,
};
use crate::{log_error, log_info, log_warn};
use ethers_core::types::U256;
use serde::Serialize;

/// Errors from the verification collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    #[error("Contract call failed: {0}")]
    Transport(String),

    #[error("Failed to decode contract response: {0}")]
    Decode(String),

    #[error("Chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: U256, actual: U256 },

    #[error(transparent)]
    Eip712(#[from] Eip712Error),
}

/// Read-only contract call (`eth_call`) against some node.
///
/// Implementors own transport, retries and timeouts.
pub trait ContractCaller {
    fn call(
        &self,
        contract: &Address,
        from: &Address,
        calldata: &[u8],
    ) -> Result<Vec<u8>, VerifierError>;
}

impl<T: ContractCaller + ?Sized> ContractCaller for &T {
    fn call(
        &self,
        contract: &Address,
        from: &Address,
        calldata: &[u8],
    ) -> Result<Vec<u8>, VerifierError> {
        (**self).call(contract, from, calldata)
    }
}

/// Where the verifier contract lives and who calls it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Deployed verifier contract
    pub contract: Address,
    /// Account the read-only call is made from
    pub caller: Address,
    /// Chain the contract is expected to report
    pub chain_id: U256,
}

/// Arguments for `verify(from, to, value, signature)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCall {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub signature: Eip712Signature,
}

impl VerifyCall {
    /// Build the call from a `{from, to, value}` message
    pub fn from_message(
        message: &serde_json::Value,
        signature: Eip712Signature,
    ) -> Result<Self, VerifierError> {
        let schema = TypeSchema::new();
        let field = |name: &str, field_type: &FieldType| -> Result<TypedValue, Eip712Error> {
            let value = message.get(name).ok_or_else(|| {
                Eip712Error::mismatch(field_type.to_string(), format!("missing field {}", name))
            })?;
            TypedValue::from_json(&schema, field_type, value)
        };

        let (from, to, value) = match (
            field("from", &FieldType::Address)?,
            field("to", &FieldType::Address)?,
            field("value", &FieldType::Uint(256))?,
        ) {
            (TypedValue::Address(from), TypedValue::Address(to), TypedValue::Uint(value)) => {
                (from, to, value)
            }
            _ => return Err(VerifierError::Decode("unexpected message shape".to_string())),
        };

        Ok(Self {
            from,
            to,
            value,
            signature,
        })
    }

    pub fn calldata(&self) -> Vec<u8> {
        FunctionCall::verify(&self.from, &self.to, self.value, &self.signature)
    }
}

/// Outcome of checking one signature locally and on-chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossValidation {
    /// Digest the signature was checked against
    #[serde(serialize_with = "serialize_digest")]
    pub digest: Digest,
    /// Address the message claims as signer
    pub claimed: Address,
    /// Address recovered locally
    pub recovered: Address,
    /// Local verdict: recovered == claimed
    pub local_valid: bool,
    /// The contract's verdict
    pub contract_valid: bool,
}

impl CrossValidation {
    /// Both sides accept the signature
    pub fn is_valid(&self) -> bool {
        self.local_valid && self.contract_valid
    }

    /// Local and on-chain hashing agree
    pub fn agrees(&self) -> bool {
        self.local_valid == self.contract_valid
    }
}

fn serialize_digest<S: serde::Serializer>(
    digest: &Digest,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(digest)))
}

/// Client for the verifier contract
pub struct ContractVerifier<C> {
    caller: C,
    config: VerifierConfig,
}

impl<C: ContractCaller> ContractVerifier<C> {
    pub fn new(caller: C, config: VerifierConfig) -> Self {
        Self { caller, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Chain id reported by the contract
    pub fn chain_id(&self) -> Result<U256, VerifierError> {
        let output = self.call_contract(&FunctionCall::get_chain_id())?;
        FunctionResult::uint256(&output)
    }

    /// Fail unless the contract reports the configured chain id
    pub fn ensure_chain_id(&self) -> Result<(), VerifierError> {
        let actual = self.chain_id()?;
        if actual != self.config.chain_id {
            log_warn!(
                "verifier",
                "Contract reports unexpected chain id",
                contract = self.config.contract,
                expected = self.config.chain_id,
                actual = actual,
            );
            return Err(VerifierError::ChainIdMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Ask the contract whether `call.signature` is valid for the arguments
    pub fn verify(&self, call: &VerifyCall) -> Result<bool, VerifierError> {
        let output = self.call_contract(&call.calldata())?;
        FunctionResult::bool(&output)
    }

    fn call_contract(&self, calldata: &[u8]) -> Result<Vec<u8>, VerifierError> {
        self.caller
            .call(&self.config.contract, &self.config.caller, calldata)
            .map_err(|e| {
                log_error!(
                    "verifier",
                    "Contract call failed",
                    contract = self.config.contract,
                    error = e,
                );
                e
            })
    }

    /// Recover the signer locally and compare with the contract's verdict.
    ///
    /// The typed data's domain must name the configured chain and contract,
    /// and the contract must report the configured chain.
    pub fn cross_validate(
        &self,
        typed_data: &TypedData,
        signature: &Eip712Signature,
    ) -> Result<CrossValidation, VerifierError> {
        let domain = typed_data.domain();
        if let Some(chain_id) = domain.chain_id {
            if chain_id != self.config.chain_id {
                return Err(VerifierError::ChainIdMismatch {
                    expected: self.config.chain_id,
                    actual: chain_id,
                });
            }
        }
        if let Some(contract) = domain.verifying_contract {
            if contract != self.config.contract {
                return Err(VerifierError::Eip712(Eip712Error::mismatch(
                    "verifyingContract",
                    format!("domain names {}, verifier is {}", contract, self.config.contract),
                )));
            }
        }
        self.ensure_chain_id()?;

        let digest = eip712::hash_typed_data(typed_data)?;
        let recovered = eip712::recover_address(&digest, signature)?;
        let call = VerifyCall::from_message(typed_data.message(), *signature)?;
        let contract_valid = self.verify(&call)?;

        let result = CrossValidation {
            digest,
            claimed: call.from,
            recovered,
            local_valid: recovered == call.from,
            contract_valid,
        };

        if result.agrees() {
            log_info!(
                "verifier",
                "Signature cross-validated",
                digest = hex::encode(digest),
                signer = recovered,
                valid = result.is_valid(),
            );
        } else {
            log_warn!(
                "verifier",
                "Local and contract verdicts differ",
                digest = hex::encode(digest),
                signer = recovered,
                local_valid = result.local_valid,
                contract_valid = result.contract_valid,
            );
        }

        Ok(result)
    }
}

//! typed-signer CLI
//!
//! Hash, sign and recover EIP-712 typed data documents.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use typed_signer::eip712::{
    self, Address, Eip712Error, Eip712Signature, RecoveryIdConvention, TypedData,
};
use typed_signer::error::SignerError;
use typed_signer::utils::logging;
use typed_signer::log_debug;

#[derive(Parser)]
#[command(name = "typed-signer")]
#[command(about = "Hash, sign and recover EIP-712 typed data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the domain separator, struct hash and digest
    Hash(InputArgs),

    /// Print the encoded type string and type hash
    EncodeType {
        #[command(flatten)]
        input: InputArgs,

        /// Struct type to encode (defaults to the primary type)
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
    },

    /// Sign a typed data document
    Sign {
        #[command(flatten)]
        input: InputArgs,

        /// Hex-encoded 32-byte private key
        #[arg(short, long)]
        key: String,

        /// Write v as 0/1 instead of 27/28
        #[arg(long)]
        parity: bool,
    },

    /// Recover the signer of a typed data document
    Recover {
        #[command(flatten)]
        input: InputArgs,

        /// 65-byte hex signature (r || s || v)
        #[arg(short, long)]
        signature: String,
    },

    /// Check that a signature was produced by an address
    Verify {
        #[command(flatten)]
        input: InputArgs,

        /// 65-byte hex signature (r || s || v)
        #[arg(short, long)]
        signature: String,

        /// Expected signer address
        #[arg(short, long)]
        address: String,
    },

    /// Derive the address of a private key
    Address {
        /// Hex-encoded 32-byte private key
        #[arg(short, long)]
        key: String,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Typed data JSON file, or - for stdin
    file: String,
}

impl InputArgs {
    fn load(&self) -> Result<TypedData> {
        let payload = if self.file == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read typed data from stdin")?;
            buffer
        } else {
            fs::read_to_string(&self.file).with_context(|| format!("failed to read {}", self.file))?
        };

        log_debug!("cli", "Loaded typed data", source = self.file, bytes = payload.len());
        Ok(TypedData::from_json(&payload)?)
    }
}

/// What a command produced: a text line and its JSON form
struct Output {
    text: String,
    json: serde_json::Value,
    success: bool,
}

impl Output {
    fn ok(text: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            json,
            success: true,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match run(&cli.command) {
        Ok(output) => {
            if cli.json {
                println!("{}", output.json);
            } else {
                println!("{}", output.text);
            }
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            log_debug!("cli", "Command failed", error = format!("{:#}", err));
            if cli.json {
                println!("{}", json!({ "error": to_signer_error(&err) }));
            } else {
                eprintln!("error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Commands) -> Result<Output> {
    match command {
        Commands::Hash(input) => {
            let typed_data = input.load()?;
            let pre_image = eip712::get_pre_image(&typed_data)?;

            let text = format!(
                "domain_separator: {}\nstruct_hash: {}\ndigest: {}",
                hex_digest(&pre_image.domain_separator),
                hex_digest(&pre_image.struct_hash),
                hex_digest(&pre_image.final_hash),
            );
            Ok(Output::ok(
                text,
                json!({
                    "domainSeparator": hex_digest(&pre_image.domain_separator),
                    "structHash": hex_digest(&pre_image.struct_hash),
                    "digest": hex_digest(&pre_image.final_hash),
                }),
            ))
        }

        Commands::EncodeType { input, type_name } => {
            let typed_data = input.load()?;
            typed_data.validate()?;
            let type_name = type_name.as_deref().unwrap_or(typed_data.primary_type());

            let encoded = eip712::encode_type(&typed_data.types, type_name)?;
            let type_hash = eip712::type_hash(&typed_data.types, type_name)?;
            Ok(Output::ok(
                encoded.clone(),
                json!({ "encodeType": encoded, "typeHash": hex_digest(&type_hash) }),
            ))
        }

        Commands::Sign { input, key, parity } => {
            let typed_data = input.load()?;
            let private_key = eip712::decode_private_key(key)?;
            let convention = if *parity {
                RecoveryIdConvention::Parity
            } else {
                RecoveryIdConvention::Legacy
            };

            let digest = typed_data.encode_hash()?;
            let signature = eip712::sign_hash(&private_key, &digest, convention)?;
            let signer = eip712::address_from_private_key(&private_key)?;
            let parts = signature.parts();

            Ok(Output::ok(
                signature.to_hex(),
                json!({
                    "signature": signature,
                    "r": parts.r,
                    "s": parts.s,
                    "v": parts.v,
                    "signer": signer,
                    "digest": hex_digest(&digest),
                }),
            ))
        }

        Commands::Recover { input, signature } => {
            let typed_data = input.load()?;
            let signature = Eip712Signature::from_hex(signature)?;
            let signer = eip712::recover_typed_data(&typed_data, &signature)?;

            Ok(Output::ok(
                signer.to_checksum(),
                json!({ "address": signer, "lowS": signature.is_low_s() }),
            ))
        }

        Commands::Verify {
            input,
            signature,
            address,
        } => {
            let typed_data = input.load()?;
            let signature = Eip712Signature::from_hex(signature)?;
            let expected: Address = address.parse()?;

            let recovered = eip712::recover_typed_data(&typed_data, &signature)?;
            let valid = recovered == expected;

            Ok(Output {
                text: if valid { "valid" } else { "invalid" }.to_string(),
                json: json!({ "valid": valid, "recovered": recovered, "expected": expected }),
                success: valid,
            })
        }

        Commands::Address { key } => {
            let private_key = eip712::decode_private_key(key)?;
            let address = eip712::address_from_private_key(&private_key)?;
            Ok(Output::ok(address.to_checksum(), json!({ "address": address })))
        }
    }
}

fn hex_digest(digest: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(digest))
}

fn to_signer_error(err: &anyhow::Error) -> SignerError {
    match err.downcast_ref::<Eip712Error>() {
        Some(e) => SignerError::from(e.clone()),
        None => match err.downcast_ref::<io::Error>() {
            Some(_) => SignerError::invalid_input(format!("{:#}", err)),
            None => SignerError::internal(format!("{:#}", err)),
        },
    }
}

//! Recoverable ECDSA signature in Ethereum layout (`r || s || v`).

use super::types::Eip712Error;
use crate::utils::crypto::strip_hex_prefix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// secp256k1 group order divided by two, big-endian
const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// How the recovery parity is written into `v`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryIdConvention {
    /// 27 or 28, what `ecrecover` and most wallets expect
    #[default]
    Legacy,
    /// 0 or 1
    Parity,
}

impl RecoveryIdConvention {
    pub fn encode(self, parity: u8) -> u8 {
        match self {
            RecoveryIdConvention::Legacy => parity + 27,
            RecoveryIdConvention::Parity => parity,
        }
    }
}

/// EIP-712 signature components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Eip712Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// v component (27/28 or 0/1)
    pub v: u8,
}

impl Eip712Signature {
    /// Create from raw components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Create from 65-byte signature (r || s || v)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Eip712Error> {
        if bytes.len() != 65 {
            return Err(Eip712Error::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);

        Ok(Self { r, s, v: bytes[64] })
    }

    /// Parse a `0x`-prefixed (or bare) 130-character hex signature
    pub fn from_hex(s: &str) -> Result<Self, Eip712Error> {
        let bytes = hex::decode(strip_hex_prefix(s.trim()))
            .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Convert to 65-byte representation (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Recovery parity (0 or 1) under either convention
    pub fn parity(&self) -> Result<u8, Eip712Error> {
        match self.v {
            0 | 1 => Ok(self.v),
            27 | 28 => Ok(self.v - 27),
            v => Err(Eip712Error::InvalidSignature(format!(
                "recovery byte must be 0, 1, 27 or 28, got {}",
                v
            ))),
        }
    }

    /// The same signature with `v` rewritten for another convention
    pub fn with_convention(&self, convention: RecoveryIdConvention) -> Result<Self, Eip712Error> {
        Ok(Self {
            v: convention.encode(self.parity()?),
            ..*self
        })
    }

    /// Whether `s` lies in the lower half of the curve order
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_CURVE_ORDER
    }

    /// Split into hex `r`/`s` and numeric `v`
    pub fn parts(&self) -> SignatureParts {
        SignatureParts {
            r: format!("0x{}", hex::encode(self.r)),
            s: format!("0x{}", hex::encode(self.s)),
            v: self.v,
        }
    }
}

impl fmt::Display for Eip712Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Eip712Signature {
    type Err = Eip712Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Eip712Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Eip712Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Signature split into its components, as contracts taking `(v, r, s)` want it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    pub r: String,
    pub s: String,
    pub v: u8,
}

#[cfg(test)]
mod signature_tests {
    use super::*;

    #[test]
    fn test_signature_conversion() {
        let sig = Eip712Signature::new([1u8; 32], [2u8; 32], 27);
        let bytes = sig.to_bytes();
        assert_eq!(bytes[64], 27);
        assert_eq!(Eip712Signature::from_bytes(&bytes).unwrap(), sig);
    }

    #[test]
    fn test_signature_format() {
        let sig = Eip712Signature::new([1u8; 32], [2u8; 32], 27);
        let hex = sig.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 132);
        assert_eq!(hex.parse::<Eip712Signature>().unwrap(), sig);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            Eip712Signature::from_bytes(&[0u8; 64]),
            Err(Eip712Error::InvalidSignature(_))
        ));
        assert!(Eip712Signature::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_parity_and_conventions() {
        let legacy = Eip712Signature::new([1u8; 32], [2u8; 32], 28);
        assert_eq!(legacy.parity().unwrap(), 1);

        let parity = legacy.with_convention(RecoveryIdConvention::Parity).unwrap();
        assert_eq!(parity.v, 1);
        assert_eq!(
            parity.with_convention(RecoveryIdConvention::Legacy).unwrap(),
            legacy
        );

        let bad = Eip712Signature::new([1u8; 32], [2u8; 32], 29);
        assert!(matches!(bad.parity(), Err(Eip712Error::InvalidSignature(_))));
    }

    #[test]
    fn test_low_s_boundary() {
        let at_half = Eip712Signature::new([1u8; 32], HALF_CURVE_ORDER, 27);
        assert!(at_half.is_low_s());

        let mut above = HALF_CURVE_ORDER;
        above[31] += 1;
        assert!(!Eip712Signature::new([1u8; 32], above, 27).is_low_s());
    }

    #[test]
    fn test_parts_and_serde() {
        let sig = Eip712Signature::new([0xab; 32], [0x01; 32], 27);
        let parts = sig.parts();
        assert_eq!(parts.r, format!("0x{}", "ab".repeat(32)));
        assert_eq!(parts.v, 27);

        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", sig.to_hex()));
        let back: Eip712Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}

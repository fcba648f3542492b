use std::{fmt, str::FromStr};

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::ValidationError;
use crate::pubkey::Pubkey;

pub const SIGNATURE_BYTES: usize = 64;

/// Longest base58 rendering of 64 bytes
const MAX_BASE58_LEN: usize = 88;

/// A 64-byte ed25519 signature
///
/// The first signature of a transaction doubles as its identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_BYTES]);

impl Signature {
    pub const fn new_from_array(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        <[u8; SIGNATURE_BYTES]>::try_from(bytes)
            .map(Self)
            .map_err(|_| {
                ValidationError::InvalidSignature(format!(
                    "invalid signature length: expected 64, got {}",
                    bytes.len()
                ))
            })
    }

    pub fn to_bytes(self) -> [u8; SIGNATURE_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_BYTES] {
        &self.0
    }

    /// Check this signature over `message` against `pubkey`
    pub fn verify(&self, pubkey: &Pubkey, message: &[u8]) -> bool {
        verify(message, self, pubkey)
    }
}

/// Strict ed25519 verification
///
/// Rejects small-order keys and non-canonical encodings in addition to plain
/// mismatches, so a signature that passes here also passes on-chain.
pub fn verify(message: &[u8], signature: &Signature, pubkey: &Pubkey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(pubkey.as_bytes()) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &signature).is_ok()
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_BYTES])
    }
}

impl From<[u8; SIGNATURE_BYTES]> for Signature {
    fn from(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(signature: ed25519_dalek::Signature) -> Self {
        Self(signature.to_bytes())
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Signature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::InvalidSignature("empty signature".to_string()));
        }
        if s.len() > MAX_BASE58_LEN {
            return Err(ValidationError::InvalidSignature(format!(
                "invalid signature length: expected at most {} characters, got {}",
                MAX_BASE58_LEN,
                s.len()
            )));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ValidationError::InvalidSignature(format!("invalid base58: {}", e)))?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_verify_accepts_valid_and_rejects_tampered() {
        let signing = SigningKey::from_bytes(&[3u8; 32]);
        let pubkey = Pubkey::from(signing.verifying_key().to_bytes());
        let message = b"hello";
        let signature = Signature::from(signing.sign(message));

        assert!(verify(message, &signature, &pubkey));
        assert!(!verify(b"hellp", &signature, &pubkey));

        let mut bytes = signature.to_bytes();
        bytes[10] ^= 0x01;
        assert!(!verify(message, &Signature::from(bytes), &pubkey));

        let other = Pubkey::from(SigningKey::from_bytes(&[4u8; 32]).verifying_key().to_bytes());
        assert!(!signature.verify(&other, message));
    }

    #[test]
    fn test_verify_rejects_small_order_pubkey() {
        // identity point
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        let weak = Pubkey::from(bytes);
        assert!(!verify(b"x", &Signature::default(), &weak));
    }

    #[test]
    fn test_base58_roundtrip() {
        let signing = SigningKey::from_bytes(&[9u8; 32]);
        let signature = Signature::from(signing.sign(b"payload"));
        let text = signature.to_string();
        assert!(text.len() <= MAX_BASE58_LEN);
        assert_eq!(text.parse::<Signature>().unwrap(), signature);

        assert!("".parse::<Signature>().is_err());
        assert!("11111111111111111111111111111111".parse::<Signature>().is_err());
    }
}

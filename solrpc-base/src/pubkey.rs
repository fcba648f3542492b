//! Account addresses, blockhashes and program address derivation
//!
//! Both [`Pubkey`] and [`Hash`] are raw 32-byte values that render as base58
//! text, which is also how they travel over JSON-RPC.

use std::{fmt, str::FromStr};

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

pub const PUBKEY_BYTES: usize = 32;
pub const HASH_BYTES: usize = 32;

/// Longest base58 rendering of 32 bytes
const MAX_BASE58_LEN: usize = 44;

/// Maximum length of a single derivation seed
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, bump included
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

fn decode_base58_32(s: &str) -> Result<[u8; 32], String> {
    if s.is_empty() {
        return Err("empty string".to_string());
    }
    if s.len() > MAX_BASE58_LEN {
        return Err(format!(
            "invalid length: expected at most {} characters, got {}",
            MAX_BASE58_LEN,
            s.len()
        ));
    }
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| format!("invalid base58: {}", e))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| format!("invalid length: expected 32 bytes, got {}", bytes.len()))
}

/// A 32-byte ed25519 public key or program derived address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create a Pubkey from a byte slice of exactly 32 bytes
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        <[u8; PUBKEY_BYTES]>::try_from(bytes)
            .map(Self)
            .map_err(|_| {
                ValidationError::InvalidPubkey(format!(
                    "invalid pubkey length: expected 32, got {}",
                    bytes.len()
                ))
            })
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Whether the key is a valid point on the ed25519 curve
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// Derive an account address from a base key, a text seed and an owner program
    pub fn create_with_seed(
        base: &Pubkey,
        seed: &str,
        owner: &Pubkey,
    ) -> Result<Pubkey, ValidationError> {
        if seed.len() > MAX_SEED_LEN {
            return Err(ValidationError::InvalidSeeds(format!(
                "seed length {} exceeds maximum {}",
                seed.len(),
                MAX_SEED_LEN
            )));
        }
        if owner.0.ends_with(PDA_MARKER) {
            return Err(ValidationError::InvalidSeeds(
                "owner collides with the program address marker".to_string(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(base.0);
        hasher.update(seed.as_bytes());
        hasher.update(owner.0);
        Ok(Self(hasher.finalize().into()))
    }

    /// Derive a program address from exact seeds
    ///
    /// Fails when the seeds are out of bounds or the resulting hash lands on
    /// the curve, since such an address would have a private key.
    pub fn create_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<Pubkey, ValidationError> {
        if seeds.len() > MAX_SEEDS {
            return Err(ValidationError::InvalidSeeds(format!(
                "{} seeds exceeds maximum {}",
                seeds.len(),
                MAX_SEEDS
            )));
        }
        if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
            return Err(ValidationError::InvalidSeeds(format!(
                "seed length {} exceeds maximum {}",
                seed.len(),
                MAX_SEED_LEN
            )));
        }

        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update(program_id.0);
        hasher.update(PDA_MARKER);
        let address = Self(hasher.finalize().into());

        if address.is_on_curve() {
            return Err(ValidationError::InvalidSeeds(
                "derived address lies on the ed25519 curve".to_string(),
            ));
        }
        Ok(address)
    }

    /// Find the first off-curve program address, searching bump seeds from 255 down
    pub fn find_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<(Pubkey, u8), ValidationError> {
        if seeds.len() >= MAX_SEEDS {
            return Err(ValidationError::InvalidSeeds(format!(
                "{} seeds leaves no room for a bump seed",
                seeds.len()
            )));
        }

        if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
            return Err(ValidationError::InvalidSeeds(format!(
                "seed length {} exceeds maximum {}",
                seed.len(),
                MAX_SEED_LEN
            )));
        }

        for bump in (1..=u8::MAX).rev() {
            let bump_seed = [bump];
            let mut with_bump: Vec<&[u8]> = seeds.to_vec();
            with_bump.push(&bump_seed);
            if let Ok(address) = Self::create_program_address(&with_bump, program_id) {
                return Ok((address, bump));
            }
        }
        Err(ValidationError::InvalidSeeds(
            "no viable bump seed found".to_string(),
        ))
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58_32(s)
            .map(Self)
            .map_err(ValidationError::InvalidPubkey)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A 32-byte block hash, used as the recent blockhash of a message
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_BYTES]);

impl Hash {
    pub const fn new_from_array(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of `data`
    pub fn sha256(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn to_bytes(self) -> [u8; HASH_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }
}

impl From<[u8; HASH_BYTES]> for Hash {
    fn from(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Hash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58_32(s)
            .map(Self)
            .map_err(ValidationError::InvalidHash)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn key(last: u8) -> Pubkey {
        let mut bytes = [0u8; 32];
        bytes[31] = last;
        Pubkey::from(bytes)
    }

    #[test]
    fn test_base58_roundtrip() {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 32];
        for _ in 0..1_000 {
            rng.fill_bytes(&mut bytes);
            let pubkey = Pubkey::from(bytes);
            let text = pubkey.to_string();
            assert!(text.len() <= MAX_BASE58_LEN);
            assert_eq!(text.parse::<Pubkey>().unwrap(), pubkey);
        }
    }

    #[test]
    fn test_known_base58_values() {
        assert_eq!(
            Pubkey::default().to_string(),
            "11111111111111111111111111111111"
        );
        let hash: Hash = "EETubP5AKHgjPAhzPAFcb8BAY1hMH639CWCFTqi3hq1k"
            .parse()
            .unwrap();
        assert_eq!(hash.to_string(), "EETubP5AKHgjPAhzPAFcb8BAY1hMH639CWCFTqi3hq1k");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "".parse::<Pubkey>(),
            Err(ValidationError::InvalidPubkey(_))
        ));
        // '0' is not in the base58 alphabet
        assert!("0".repeat(32).parse::<Pubkey>().is_err());
        // decodes to fewer than 32 bytes
        assert!("3yZe7d".parse::<Pubkey>().is_err());
        assert!("1".repeat(45).parse::<Pubkey>().is_err());
        assert!(matches!(
            "abc".parse::<Hash>(),
            Err(ValidationError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_serde_as_base58_string() {
        let pubkey = key(7);
        let json = serde_json::to_string(&pubkey).unwrap();
        assert_eq!(json, format!("\"{}\"", pubkey));
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pubkey);
        assert!(serde_json::from_str::<Pubkey>("\"not-base58\"").is_err());
    }

    #[test]
    fn test_create_program_address_rejects_long_seed() {
        let program = key(9);
        let long = [0u8; MAX_SEED_LEN + 1];
        assert!(Pubkey::create_program_address(&[&long], &program).is_err());
        assert!(Pubkey::find_program_address(&[&long], &program).is_err());
    }

    #[test]
    fn test_create_program_address_rejects_too_many_seeds() {
        let program = key(9);
        let seeds: Vec<&[u8]> = vec![b"a"; MAX_SEEDS + 1];
        assert!(Pubkey::create_program_address(&seeds, &program).is_err());
        let seeds: Vec<&[u8]> = vec![b"a"; MAX_SEEDS];
        assert!(Pubkey::find_program_address(&seeds, &program).is_err());
    }

    #[test]
    fn test_find_program_address_is_off_curve_and_reproducible() {
        let program = key(42);
        for seed in [&b"vault"[..], b"", b"metadata", &[0xffu8; 32]] {
            let (address, bump) = Pubkey::find_program_address(&[seed], &program).unwrap();
            assert!(!address.is_on_curve());
            let again = Pubkey::create_program_address(&[seed, &[bump]], &program).unwrap();
            assert_eq!(address, again);
        }
    }

    #[test]
    fn test_create_with_seed() {
        let base = key(1);
        let owner = key(2);
        let a = Pubkey::create_with_seed(&base, "stake:0", &owner).unwrap();
        let b = Pubkey::create_with_seed(&base, "stake:1", &owner).unwrap();
        assert_ne!(a, b);

        let mut hasher = Sha256::new();
        hasher.update(base.as_bytes());
        hasher.update(b"stake:0");
        hasher.update(owner.as_bytes());
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(a, Pubkey::from(expected));

        assert!(Pubkey::create_with_seed(&base, &"x".repeat(33), &owner).is_err());
    }

    #[test]
    fn test_real_keys_are_on_curve() {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let pubkey = Pubkey::from(signing.verifying_key().to_bytes());
        assert!(pubkey.is_on_curve());
    }
}

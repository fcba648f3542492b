//! Ed25519 keypairs and the [`Signer`] abstraction
//!
//! Secret material lives in an [`ed25519_dalek::SigningKey`], which wipes
//! itself on drop. Intermediate buffers holding secret bytes are wrapped in
//! [`Zeroizing`] for the same reason.

use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey};
use rand::TryRngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{Result, TxnError};
use crate::pubkey::Pubkey;
use crate::signature::Signature;

pub const SECRET_KEY_BYTES: usize = 32;
pub const KEYPAIR_BYTES: usize = 64;

/// Anything able to produce signatures for one public key
pub trait Signer {
    fn pubkey(&self) -> Pubkey;

    /// Sign serialized message bytes
    fn try_sign_message(&self, message: &[u8]) -> Result<Signature>;
}

impl<T: Signer + ?Sized> Signer for &T {
    fn pubkey(&self) -> Pubkey {
        (**self).pubkey()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature> {
        (**self).try_sign_message(message)
    }
}

/// An ed25519 keypair
pub struct Keypair {
    signing_key: SigningKey,
    pubkey: Pubkey,
}

impl Keypair {
    /// Generate a fresh keypair from the operating system RNG
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_BYTES]);
        let mut rng = OsRng;
        rng.try_fill_bytes(&mut seed[..])
            .map_err(|e| TxnError::InvalidKeypair(format!("rng failure: {}", e)))?;
        Ok(Self::from_seed(&seed))
    }

    /// Build a keypair from a 32-byte secret seed
    pub fn from_seed(seed: &[u8; SECRET_KEY_BYTES]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let pubkey = Pubkey::from(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            pubkey,
        }
    }

    /// Parse the 64-byte `secret || public` layout
    ///
    /// The public half must match the key derived from the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_BYTES {
            return Err(TxnError::InvalidKeypair(format!(
                "keypair must be {} bytes, got {}",
                KEYPAIR_BYTES,
                bytes.len()
            )));
        }
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_BYTES]);
        seed.copy_from_slice(&bytes[..SECRET_KEY_BYTES]);
        let keypair = Self::from_seed(&seed);
        if keypair.pubkey.as_bytes()[..] != bytes[SECRET_KEY_BYTES..] {
            return Err(TxnError::InvalidKeypair(
                "public key does not match secret key".to_string(),
            ));
        }
        Ok(keypair)
    }

    /// Parse a base58 encoded 64-byte keypair
    pub fn from_base58_string(s: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            bs58::decode(s)
                .into_vec()
                .map_err(|e| TxnError::InvalidKeypair(format!("invalid base58: {}", e)))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Build a keypair from a hex encoded 32-byte secret seed
    pub fn from_hex_private_key<P: AsRef<[u8]>>(hex_private_key: P) -> Result<Self> {
        let bytes = Zeroizing::new(hex::decode(hex_private_key).map_err(|e| {
            TxnError::InvalidKeypair(format!("Failed to decode hex private key: {}", e))
        })?);
        if bytes.len() != SECRET_KEY_BYTES {
            return Err(TxnError::InvalidKeypair(format!(
                "Private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_BYTES]);
        seed.copy_from_slice(&bytes);
        Ok(Self::from_seed(&seed))
    }

    /// The 64-byte `secret || public` layout
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEYPAIR_BYTES]> {
        let mut out = Zeroizing::new([0u8; KEYPAIR_BYTES]);
        out[..SECRET_KEY_BYTES].copy_from_slice(self.signing_key.as_bytes());
        out[SECRET_KEY_BYTES..].copy_from_slice(self.pubkey.as_bytes());
        out
    }

    pub fn to_base58_string(&self) -> Zeroizing<String> {
        Zeroizing::new(bs58::encode(&self.to_bytes()[..]).into_string())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.pubkey.as_bytes())
    }

    /// Deterministic RFC 8032 signature over `message`
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::from(self.signing_key.sign(message))
    }
}

impl Signer for Keypair {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature> {
        Ok(self.sign_message(message))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

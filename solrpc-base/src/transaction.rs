//! Transaction assembly
//!
//! [`Transaction`] holds one signature slot per required signer and may be
//! filled in any order by any number of independent signers. Only
//! [`Transaction::finalize`] produces a [`SignedTransaction`], which is the
//! sole type that can be encoded for submission.

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::debug;

use crate::error::{Result, TxnError};
use crate::keypair::Signer;
use crate::message::Message;
use crate::pubkey::Pubkey;
use crate::short_vec::{self, ByteReader};
use crate::signature::{SIGNATURE_BYTES, Signature, verify};

/// Largest serialized transaction accepted by the network
pub const PACKET_DATA_SIZE: usize = 1232;

/// A message with partially collected signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    message: Message,
    message_bytes: Vec<u8>,
    signatures: Vec<Option<Signature>>,
}

impl Transaction {
    /// Wrap a compiled message with empty signature slots
    pub fn new(message: Message) -> Result<Self> {
        message.sanitize()?;
        let message_bytes = message.serialize()?;
        let signatures = vec![None; message.header.num_required_signatures as usize];
        Ok(Self {
            message,
            message_bytes,
            signatures,
        })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The exact bytes every signer signs
    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    pub fn signatures(&self) -> &[Option<Signature>] {
        &self.signatures
    }

    fn slot_for(&self, pubkey: &Pubkey) -> Result<usize> {
        self.message
            .signer_index(pubkey)
            .ok_or(TxnError::UnknownSigner(*pubkey))
    }

    /// Sign with `signer` and store the signature in its slot
    ///
    /// Signing again with the same key overwrites the previous signature.
    pub fn add_signature(&mut self, signer: &dyn Signer) -> Result<()> {
        let pubkey = signer.pubkey();
        let slot = self.slot_for(&pubkey)?;
        let signature = signer.try_sign_message(&self.message_bytes)?;
        self.signatures[slot] = Some(signature);
        debug!(signer = %pubkey, slot, "added signature");
        Ok(())
    }

    /// Insert a signature produced elsewhere, after checking it
    pub fn add_external_signature(&mut self, pubkey: &Pubkey, signature: Signature) -> Result<()> {
        let slot = self.slot_for(pubkey)?;
        if !verify(&self.message_bytes, &signature, pubkey) {
            return Err(TxnError::InvalidSignature(*pubkey));
        }
        self.signatures[slot] = Some(signature);
        debug!(signer = %pubkey, slot, "added external signature");
        Ok(())
    }

    /// Sign with every signer in `signers`
    ///
    /// All signers are checked against the message before any slot changes.
    pub fn partial_sign(&mut self, signers: &[&dyn Signer]) -> Result<()> {
        let slots = signers
            .iter()
            .map(|signer| self.slot_for(&signer.pubkey()))
            .collect::<Result<Vec<_>>>()?;
        let signatures = signers
            .iter()
            .map(|signer| signer.try_sign_message(&self.message_bytes))
            .collect::<Result<Vec<_>>>()?;
        for (slot, signature) in slots.into_iter().zip(signatures) {
            self.signatures[slot] = Some(signature);
        }
        Ok(())
    }

    /// Sign with `signers` and finalize in one step
    pub fn sign(mut self, signers: &[&dyn Signer]) -> Result<SignedTransaction> {
        self.partial_sign(signers)?;
        self.finalize()
    }

    /// Required signers that have not signed yet
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.message
            .signer_keys()
            .iter()
            .zip(&self.signatures)
            .filter(|(_, sig)| sig.is_none())
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.iter().all(Option::is_some)
    }

    /// Produce a submittable transaction once every required signature is present
    pub fn finalize(&self) -> Result<SignedTransaction> {
        let missing = self.missing_signers();
        if !missing.is_empty() {
            return Err(TxnError::IncompleteSignatures {
                present: self.signatures.len() - missing.len(),
                required: self.signatures.len(),
                missing,
            });
        }

        let signatures: Vec<Signature> = self.signatures.iter().flatten().copied().collect();
        let signed = SignedTransaction {
            signatures,
            message: self.message.clone(),
            message_bytes: self.message_bytes.clone(),
        };
        let size = signed.serialized_size();
        if size > PACKET_DATA_SIZE {
            return Err(TxnError::TransactionTooLarge {
                size,
                max_size: PACKET_DATA_SIZE,
            });
        }
        Ok(signed)
    }
}

/// A transaction carrying every required signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    signatures: Vec<Signature>,
    message: Message,
    message_bytes: Vec<u8>,
}

impl SignedTransaction {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// The fee payer's signature, which identifies the transaction
    pub fn signature(&self) -> &Signature {
        // finalize and deserialize both guarantee at least one signature
        &self.signatures[0]
    }

    fn serialized_size(&self) -> usize {
        let count_prefix = match self.signatures.len() {
            0..=0x7f => 1,
            0x80..=0x3fff => 2,
            _ => 3,
        };
        count_prefix + self.signatures.len() * SIGNATURE_BYTES + self.message_bytes.len()
    }

    /// Encode as `[signature count][signatures][message]`
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        // at most 255 signatures, always fits a compact-u16
        short_vec::encode_length(&mut out, self.signatures.len() as u16);
        for signature in &self.signatures {
            out.extend_from_slice(signature.as_bytes());
        }
        out.extend_from_slice(&self.message_bytes);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let signatures = reader.read_compact_array(SIGNATURE_BYTES, |r| {
            Ok(Signature::from(r.read_array::<SIGNATURE_BYTES>()?))
        })?;
        let message_start = reader.position();
        let message = Message::decode(&mut reader)?;
        let message_bytes = bytes[message_start..reader.position()].to_vec();
        reader.finish()?;

        let required = message.header.num_required_signatures as usize;
        if signatures.len() != required {
            return Err(TxnError::malformed(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                required
            )));
        }
        Ok(Self {
            signatures,
            message,
            message_bytes,
        })
    }

    /// Base64 of the wire encoding, as accepted by `sendTransaction`
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.serialize())
    }

    /// Check every signature against its signer key
    pub fn verify(&self) -> bool {
        self.message
            .signer_keys()
            .iter()
            .zip(&self.signatures)
            .all(|(key, sig)| verify(&self.message_bytes, sig, key))
    }
}

//! Message compilation and wire encoding
//!
//! A message is the signed portion of a transaction. Compilation flattens the
//! accounts of every instruction into one deduplicated key table, ordered by
//! role, and rewrites instructions to reference that table by index:
//!
//! ```text
//! [ signer+writable | signer+readonly | writable | readonly ]
//!   ^ fee payer at index 0
//! ```
//!
//! Inside each group keys are ordered by their raw bytes, so the output only
//! depends on the set of (key, role) pairs and not on the order in which
//! instructions listed them.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use crate::error::{Result, TxnError};
use crate::instruction::{CompiledInstruction, Instruction};
use crate::pubkey::{HASH_BYTES, Hash, PUBKEY_BYTES, Pubkey};
use crate::short_vec::{self, ByteReader, MAX_COMPACT_LEN};

/// Highest number of keys a message may carry
pub const MAX_ACCOUNTS: usize = 255;

/// Smallest encoded instruction: program index plus two empty compact arrays
const MIN_INSTRUCTION_BYTES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Signatures required, equal to the number of signer keys
    pub num_required_signatures: u8,
    /// Trailing signer keys that are read-only
    pub num_readonly_signed_accounts: u8,
    /// Trailing non-signer keys that are read-only
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct Role {
    is_signer: bool,
    is_writable: bool,
}

impl Role {
    fn merge(&mut self, is_signer: bool, is_writable: bool) {
        self.is_signer |= is_signer;
        self.is_writable |= is_writable;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions into a message paid for by `fee_payer`
    pub fn compile(
        fee_payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> Result<Self> {
        if instructions.is_empty() {
            return Err(TxnError::NoInstructions);
        }
        if let Some(ix) = instructions.iter().find(|ix| ix.data.len() > MAX_COMPACT_LEN) {
            return Err(TxnError::InstructionDataTooLarge {
                len: ix.data.len(),
                max_len: MAX_COMPACT_LEN,
            });
        }

        // BTreeMap keeps keys in byte order, which is the in-group order
        let mut roles: BTreeMap<Pubkey, Role> = BTreeMap::new();
        for ix in instructions {
            roles.entry(ix.program_id).or_default();
            for meta in &ix.accounts {
                roles
                    .entry(meta.pubkey)
                    .or_default()
                    .merge(meta.is_signer, meta.is_writable);
            }
        }
        roles.remove(fee_payer);

        let count = roles.len() + 1;
        if count > MAX_ACCOUNTS {
            return Err(TxnError::TooManyAccounts {
                count,
                max_count: MAX_ACCOUNTS,
            });
        }

        let mut signer_writable = vec![*fee_payer];
        let mut signer_readonly = Vec::new();
        let mut writable = Vec::new();
        let mut readonly = Vec::new();
        for (key, role) in roles {
            match (role.is_signer, role.is_writable) {
                (true, true) => signer_writable.push(key),
                (true, false) => signer_readonly.push(key),
                (false, true) => writable.push(key),
                (false, false) => readonly.push(key),
            }
        }

        // count <= 255 bounds every group size below
        let header = MessageHeader {
            num_required_signatures: (signer_writable.len() + signer_readonly.len()) as u8,
            num_readonly_signed_accounts: signer_readonly.len() as u8,
            num_readonly_unsigned_accounts: readonly.len() as u8,
        };

        let mut account_keys = signer_writable;
        account_keys.extend(signer_readonly);
        account_keys.extend(writable);
        account_keys.extend(readonly);

        let index_of: HashMap<Pubkey, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i as u8))
            .collect();
        let position = |key: &Pubkey| -> Result<u8> {
            index_of.get(key).copied().ok_or_else(|| {
                TxnError::malformed(format!("account {} missing from key table", key))
            })
        };

        let instructions = instructions
            .iter()
            .map(|ix| {
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|meta| position(&meta.pubkey))
                    .collect::<Result<Vec<u8>>>()?;
                Ok(CompiledInstruction::new(
                    position(&ix.program_id)?,
                    accounts,
                    ix.data.clone(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        trace!(
            accounts = account_keys.len(),
            instructions = instructions.len(),
            required_signatures = header.num_required_signatures,
            "compiled message"
        );

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// The key that pays fees, always the first key
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Keys whose signatures are required, in signature order
    pub fn signer_keys(&self) -> &[Pubkey] {
        let end = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..end]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize && index < self.account_keys.len()
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let num_keys = self.account_keys.len();
        let num_signed = self.header.num_required_signatures as usize;
        if index >= num_keys {
            return false;
        }
        if index < num_signed {
            index < num_signed.saturating_sub(self.header.num_readonly_signed_accounts as usize)
        } else {
            index < num_keys.saturating_sub(self.header.num_readonly_unsigned_accounts as usize)
        }
    }

    /// Position of `pubkey` among the required signers
    pub fn signer_index(&self, pubkey: &Pubkey) -> Option<usize> {
        self.signer_keys().iter().position(|key| key == pubkey)
    }

    /// Encode to the wire layout
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.account_keys.len() > MAX_ACCOUNTS {
            return Err(TxnError::TooManyAccounts {
                count: self.account_keys.len(),
                max_count: MAX_ACCOUNTS,
            });
        }

        let mut out = Vec::with_capacity(
            3 + 1 + self.account_keys.len() * PUBKEY_BYTES + HASH_BYTES + 1,
        );
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);
        short_vec::write_compact_array(&mut out, &self.account_keys, |out, key| {
            out.extend_from_slice(key.as_bytes());
            Ok(())
        })?;
        out.extend_from_slice(self.recent_blockhash.as_bytes());
        short_vec::write_compact_array(&mut out, &self.instructions, |out, ix| {
            out.push(ix.program_id_index);
            short_vec::write_compact_bytes(out, &ix.accounts)?;
            short_vec::write_compact_bytes(out, &ix.data)
        })?;
        Ok(out)
    }

    /// Decode a message occupying the whole of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let message = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(message)
    }

    /// Decode a message from the front of `reader`, leaving the rest unread
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        let header = MessageHeader {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        };
        let account_keys =
            reader.read_compact_array(PUBKEY_BYTES, |r| Ok(Pubkey::from(r.read_array::<32>()?)))?;
        let recent_blockhash = Hash::from(reader.read_array::<32>()?);
        let instructions = reader.read_compact_array(MIN_INSTRUCTION_BYTES, |r| {
            let program_id_index = r.read_u8()?;
            let accounts = r.read_compact_bytes()?.to_vec();
            let data = r.read_compact_bytes()?.to_vec();
            Ok(CompiledInstruction::new(program_id_index, accounts, data))
        })?;

        let message = Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        };
        message.sanitize()?;
        Ok(message)
    }

    /// Check header counts and instruction indices against the key table
    pub fn sanitize(&self) -> Result<()> {
        let num_keys = self.account_keys.len();
        let num_signed = self.header.num_required_signatures as usize;
        let readonly_signed = self.header.num_readonly_signed_accounts as usize;
        let readonly_unsigned = self.header.num_readonly_unsigned_accounts as usize;

        if num_keys > MAX_ACCOUNTS {
            return Err(TxnError::TooManyAccounts {
                count: num_keys,
                max_count: MAX_ACCOUNTS,
            });
        }
        if num_signed == 0 {
            return Err(TxnError::malformed("message has no fee payer signature"));
        }
        if num_signed > num_keys {
            return Err(TxnError::malformed(format!(
                "{} required signatures but only {} keys",
                num_signed, num_keys
            )));
        }
        // the fee payer must stay writable
        if readonly_signed >= num_signed {
            return Err(TxnError::malformed(format!(
                "{} read-only signers leaves no writable fee payer",
                readonly_signed
            )));
        }
        if readonly_unsigned > num_keys - num_signed {
            return Err(TxnError::malformed(format!(
                "{} read-only unsigned accounts but only {} unsigned keys",
                readonly_unsigned,
                num_keys - num_signed
            )));
        }

        let mut seen = HashSet::with_capacity(num_keys);
        if let Some(dup) = self.account_keys.iter().find(|key| !seen.insert(**key)) {
            return Err(TxnError::malformed(format!("duplicate account key {}", dup)));
        }

        for (i, ix) in self.instructions.iter().enumerate() {
            let out_of_range = std::iter::once(&ix.program_id_index)
                .chain(ix.accounts.iter())
                .find(|idx| **idx as usize >= num_keys);
            if let Some(idx) = out_of_range {
                return Err(TxnError::malformed(format!(
                    "instruction {} references account index {} of {}",
                    i, idx, num_keys
                )));
            }
        }
        Ok(())
    }
}

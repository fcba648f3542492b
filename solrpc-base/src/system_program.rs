//! Instruction builders for the system program
//!
//! Instruction data is a little-endian u32 discriminant followed by the
//! fixed-width arguments of that instruction.

use crate::instruction::{AccountMeta, Instruction};
use crate::pubkey::Pubkey;

/// The system program id, all zero bytes
pub const ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

pub fn id() -> Pubkey {
    ID
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum SystemInstruction {
    CreateAccount = 0,
    Assign = 1,
    Transfer = 2,
    Allocate = 8,
}

fn data(kind: SystemInstruction, capacity: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + capacity);
    data.extend_from_slice(&(kind as u32).to_le_bytes());
    data
}

/// Move `lamports` from `from` to `to`; `from` must sign
pub fn transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut buf = data(SystemInstruction::Transfer, 8);
    buf.extend_from_slice(&lamports.to_le_bytes());
    Instruction::new(
        ID,
        vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
        buf,
    )
}

/// Fund and allocate `new_account`, owned by `owner`; both accounts sign
pub fn create_account(
    from: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    let mut buf = data(SystemInstruction::CreateAccount, 48);
    buf.extend_from_slice(&lamports.to_le_bytes());
    buf.extend_from_slice(&space.to_le_bytes());
    buf.extend_from_slice(owner.as_bytes());
    Instruction::new(
        ID,
        vec![
            AccountMeta::new(*from, true),
            AccountMeta::new(*new_account, true),
        ],
        buf,
    )
}

pub fn assign(account: &Pubkey, owner: &Pubkey) -> Instruction {
    let mut buf = data(SystemInstruction::Assign, 32);
    buf.extend_from_slice(owner.as_bytes());
    Instruction::new(ID, vec![AccountMeta::new(*account, true)], buf)
}

pub fn allocate(account: &Pubkey, space: u64) -> Instruction {
    let mut buf = data(SystemInstruction::Allocate, 8);
    buf.extend_from_slice(&space.to_le_bytes());
    Instruction::new(ID, vec![AccountMeta::new(*account, true)], buf)
}

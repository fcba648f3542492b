pub mod error;
pub mod instruction;
pub mod keypair;
pub mod message;
pub mod pubkey;
pub mod short_vec;
pub mod signature;
pub mod system_program;
pub mod transaction;

// re-export types
pub use error::{Result, TxnError, ValidationError};
pub use instruction::{AccountMeta, CompiledInstruction, Instruction};
pub use keypair::{Keypair, Signer};
pub use message::{MAX_ACCOUNTS, Message, MessageHeader};
pub use pubkey::{Hash, Pubkey};
pub use signature::{Signature, verify};
pub use transaction::{PACKET_DATA_SIZE, SignedTransaction, Transaction};

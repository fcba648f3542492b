//! The confirmation state machine
//!
//! Observations from polling and from push notifications feed the same
//! transition function. Commitment only moves forward and terminal states
//! never change, so stale, duplicate or reordered observations are harmless.

use serde_json::Value;
use solrpc_base::Signature;

use crate::types::{CommitmentLevel, TransactionStatus};

/// Something learned about a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The transaction is in a block at `commitment`
    Status {
        /// The slot of the containing block
        slot: u64,
        /// The commitment reported for the block
        commitment: CommitmentLevel,
        /// The execution error, if any
        err: Option<Value>,
    },
    /// The node does not know the signature
    NotFound,
    /// The chain reached this block height
    BlockHeight(u64),
}

impl From<&TransactionStatus> for Observation {
    fn from(status: &TransactionStatus) -> Self {
        Self::Status {
            slot: status.slot,
            commitment: status.commitment(),
            err: status.err.clone(),
        }
    }
}

/// How tracking ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The target commitment was reached without an execution error
    Success {
        /// The slot of the containing block
        slot: u64,
        /// The commitment observed, at least the target
        commitment: CommitmentLevel,
    },
    /// The transaction executed and failed; it will not be retried
    OnChainError {
        /// The slot of the containing block
        slot: u64,
        /// The execution error
        err: Value,
    },
    /// The blockhash expired before the target commitment was reached
    Dropped {
        /// The last block height at which the transaction was valid
        last_valid_block_height: u64,
        /// The block height that was observed past it
        block_height: u64,
    },
    /// The caller's time budget ran out
    ///
    /// Inconclusive: the transaction may still land.
    TimedOut {
        /// The highest commitment seen before giving up
        last_observed: Option<CommitmentLevel>,
    },
}

impl Outcome {
    /// Whether the transaction is known to have succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Where a tracked transaction stands
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationStatus {
    /// Sent, not yet seen in any block
    Submitted,
    /// Seen in a block, target commitment not reached yet
    Pending {
        /// The slot of the containing block
        slot: u64,
        /// The highest commitment observed so far
        commitment: CommitmentLevel,
    },
    /// Tracking is over
    Resolved(Outcome),
}

impl ConfirmationStatus {
    /// Whether tracking is over
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Confirmation state of one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationState {
    signature: Signature,
    target: CommitmentLevel,
    last_valid_block_height: Option<u64>,
    status: ConfirmationStatus,
}

impl ConfirmationState {
    /// Start tracking `signature` until it reaches `target`
    ///
    /// Without `last_valid_block_height` the transaction can only time out,
    /// never be reported dropped.
    pub fn new(
        signature: Signature,
        target: CommitmentLevel,
        last_valid_block_height: Option<u64>,
    ) -> Self {
        Self {
            signature,
            target,
            last_valid_block_height,
            status: ConfirmationStatus::Submitted,
        }
    }

    /// The tracked signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The commitment that counts as success
    pub fn target(&self) -> CommitmentLevel {
        self.target
    }

    /// The block height after which the transaction can no longer land
    pub fn last_valid_block_height(&self) -> Option<u64> {
        self.last_valid_block_height
    }

    /// The current status
    pub fn status(&self) -> &ConfirmationStatus {
        &self.status
    }

    /// Whether tracking is over
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// The highest commitment observed so far
    pub fn last_commitment(&self) -> Option<CommitmentLevel> {
        match &self.status {
            ConfirmationStatus::Pending { commitment, .. } => Some(*commitment),
            ConfirmationStatus::Resolved(Outcome::Success { commitment, .. }) => Some(*commitment),
            ConfirmationStatus::Resolved(Outcome::TimedOut { last_observed }) => *last_observed,
            _ => None,
        }
    }

    /// Apply an observation and return the resulting status
    pub fn observe(&mut self, observation: Observation) -> &ConfirmationStatus {
        if self.is_resolved() {
            return &self.status;
        }

        match observation {
            Observation::Status {
                slot,
                err: Some(err),
                ..
            } => {
                self.status = ConfirmationStatus::Resolved(Outcome::OnChainError { slot, err });
            }
            Observation::Status {
                slot,
                commitment,
                err: None,
            } => {
                let advanced = match self.status {
                    ConfirmationStatus::Pending {
                        commitment: recorded,
                        ..
                    } => commitment > recorded,
                    _ => true,
                };
                if advanced {
                    self.status = ConfirmationStatus::Pending { slot, commitment };
                }
                if let ConfirmationStatus::Pending { slot, commitment } = self.status {
                    if commitment >= self.target {
                        self.status =
                            ConfirmationStatus::Resolved(Outcome::Success { slot, commitment });
                    }
                }
            }
            Observation::NotFound => {}
            Observation::BlockHeight(block_height) => {
                if let Some(last_valid_block_height) = self.last_valid_block_height {
                    if block_height > last_valid_block_height {
                        self.status = ConfirmationStatus::Resolved(Outcome::Dropped {
                            last_valid_block_height,
                            block_height,
                        });
                    }
                }
            }
        }
        &self.status
    }

    /// Give up; no effect once resolved
    pub fn time_out(&mut self) -> &ConfirmationStatus {
        if !self.is_resolved() {
            let last_observed = self.last_commitment();
            self.status = ConfirmationStatus::Resolved(Outcome::TimedOut { last_observed });
        }
        &self.status
    }
}

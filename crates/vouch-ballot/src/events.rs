//! Notifications emitted by the ballot
//!
//! The log is append-only and totally ordered. The mirror rebuilds a round's
//! tree from the `CommitmentRegistered` entries in exactly this order.

use serde::{Deserialize, Serialize};
use vouch_runtime::{Address, Commitment, MerkleRoot, NullifierHash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BallotEvent {
    RoundStarted {
        round_id: u64,
        candidates: Vec<Address>,
        timeout: u64,
    },
    CommitmentRegistered {
        round_id: u64,
        leaf_index: u64,
        commitment: Commitment,
    },
    RegistrationClosed {
        round_id: u64,
        root: MerkleRoot,
    },
    /// Carries no voucher identity.
    VoteRevealed {
        round_id: u64,
        nullifier_hash: NullifierHash,
        vote: u32,
    },
    RoundFinished {
        round_id: u64,
        winner: Address,
    },
}

impl BallotEvent {
    pub fn round_id(&self) -> u64 {
        match self {
            BallotEvent::RoundStarted { round_id, .. }
            | BallotEvent::CommitmentRegistered { round_id, .. }
            | BallotEvent::RegistrationClosed { round_id, .. }
            | BallotEvent::VoteRevealed { round_id, .. }
            | BallotEvent::RoundFinished { round_id, .. } => *round_id,
        }
    }
}

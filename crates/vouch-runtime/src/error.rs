//! Error types for the Vouch ballot

use crate::types::Stage;
use thiserror::Error;

/// Result type alias for Vouch operations
pub type Result<T> = std::result::Result<T, VouchError>;

/// Main error type for Vouch operations
///
/// Every ballot operation that returns one of these has left the ballot
/// state exactly as it was before the call.
#[derive(Debug, Error)]
pub enum VouchError {
    /// Caller lacks the role the operation requires
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation invoked outside the stage it belongs to
    #[error("Wrong stage: expected {expected}, current stage is {actual}")]
    WrongStage { expected: Stage, actual: Stage },

    /// Voucher already committed in the current round
    #[error("Voucher already registered a commitment this round")]
    AlreadyRegistered,

    /// Nullifier hash already consumed in the current round
    #[error("Nullifier hash already revealed this round")]
    AlreadyRevealed,

    /// The membership proof was rejected by the verifier
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// Every commitment in the round has already been revealed
    #[error("All {commitments} commitments of this round are already revealed")]
    RevealsExhausted { commitments: u64 },

    /// The presented root is not the round's frozen root
    #[error("Stale root: reveal must use the frozen round root")]
    StaleRoot,

    /// Registration cannot be closed yet
    #[error("Deadline not reached: now {now}, deadline {deadline}")]
    DeadlineNotReached { now: u64, deadline: u64 },

    /// The accumulator has no free leaf left
    #[error("Merkle tree full: capacity {capacity} leaves")]
    TreeFull { capacity: u64 },

    /// The commitment is not part of the replayed registration log
    #[error("Commitment not found in the round's registration log")]
    LeafNotFound,

    /// The replayed root diverges from the frozen on-chain root
    #[error("Root mismatch: expected {expected}, replayed {actual}")]
    RootMismatch { expected: String, actual: String },

    /// Candidate sequence does not fit the deployment
    #[error("Invalid candidates: {0}")]
    InvalidCandidates(String),

    /// Declared vote is not an index into the candidate sequence
    #[error("Invalid vote {vote}: round has {candidates} candidates")]
    InvalidVote { vote: u32, candidates: usize },

    /// Tree depth outside the supported range
    #[error("Invalid tree depth {0}")]
    InvalidTreeDepth(u32),

    /// Registration events are not in acceptance order
    #[error("Registration log out of order: expected leaf {expected}, found {found}")]
    LogOutOfOrder { expected: u64, found: u64 },

    /// The event log has no frozen root for the round yet
    #[error("Round {0} registration is still open")]
    RoundNotClosed(u64),

    /// Witness construction or proof generation failed
    #[error("Proving error: {0}")]
    ProvingError(String),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

}

impl VouchError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_proof(msg: impl Into<String>) -> Self {
        Self::InvalidProof(msg.into())
    }

    pub fn invalid_candidates(msg: impl Into<String>) -> Self {
        Self::InvalidCandidates(msg.into())
    }

    pub fn proving_error(msg: impl Into<String>) -> Self {
        Self::ProvingError(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<serde_json::Error> for VouchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

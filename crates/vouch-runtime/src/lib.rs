//! Vouch Runtime
//!
//! Definitions shared by the ballot state machine and the off-chain mirror.
//! Both sides hash with [`PoseidonHasher`] and grow the same [`Accumulator`],
//! which is what keeps their roots bit-for-bit identical.

pub mod config;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod types;

// Re-export core types for convenience
pub use config::{BallotConfig, ProverConfig};
pub use error::{Result, VouchError};
pub use hash::{commitment_hash, nullifier_hash, FieldHasher, PoseidonHasher};
pub use merkle::{
    Accumulator, Direction, MerklePath, PathElement, DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH,
    MIN_TREE_DEPTH,
};
pub use types::{
    field_from_hex, field_to_hex, Address, Commitment, MerkleRoot, NullifierHash, PublicInputs,
    Stage, VouchProof,
};

// The field every component works in
pub use halo2curves::pasta::Fp;

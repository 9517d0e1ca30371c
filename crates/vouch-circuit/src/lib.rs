//! Vouch Circuit
//!
//! Halo2 membership circuit for anonymous reveals: proves that
//! `H(H(secret, nullifier), vote)` is a leaf under a public root, binding the
//! nullifier hash, the vote and the round id without disclosing the leaf.

pub mod circuit;
pub mod keys;
pub mod prover;
pub mod witness;

pub use circuit::{
    k_for_depth, rows_for_depth, VouchChip, VouchCircuit, VouchConfig, NULLIFIER_HASH_ROW,
    ROOT_ROW, ROUND_ID_ROW, VOTE_ROW,
};
pub use keys::{KeyManager, KeyMetadata, CIRCUIT_NAME};
pub use prover::{VerifyingMaterial, VouchProver};
pub use witness::VouchWitness;

//! Vouch Mirror
//!
//! The voucher's side of the ballot: generate secret-backed commitments,
//! replay a closed round's registrations into an identical tree, and turn a
//! commitment into a [`RevealBundle`] the ballot will accept.

pub mod commitment;
pub mod log;
pub mod mirror;

pub use commitment::{generate_commitment, VouchSecret};
pub use log::RoundEventLog;
pub use mirror::{check_root, MirrorTree, OffchainMirrorProver, RevealBundle};

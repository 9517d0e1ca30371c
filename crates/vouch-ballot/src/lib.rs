//! Vouch Ballot
//!
//! The on-chain side of an anonymous vouching ballot. Registered vouchers
//! commit to a candidate during `Registration`; once the deadline passes the
//! tree root is frozen and each commitment can be revealed exactly once, with
//! a zero-knowledge membership proof standing in for the voucher's identity.

pub mod ballot;
pub mod clock;
pub mod events;
pub mod registry;
pub mod round;
pub mod verifier;

pub use ballot::BallotStateMachine;
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::BallotEvent;
pub use registry::{VouchRecord, VoucherRegistry};
pub use round::Round;
pub use verifier::{Halo2VouchVerifier, VouchVerifier};

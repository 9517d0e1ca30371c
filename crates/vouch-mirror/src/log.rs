//! One round's registration history, as read back from the ballot

use serde::{Deserialize, Serialize};
use vouch_ballot::BallotEvent;
use vouch_runtime::{Commitment, MerkleRoot, Result, VouchError};

/// Commitments of a single round in acceptance order, plus the root the
/// ballot froze for it (if registration has closed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEventLog {
    round_id: u64,
    commitments: Vec<Commitment>,
    frozen_root: Option<MerkleRoot>,
}

impl RoundEventLog {
    /// Select `round_id`'s registrations from the ballot's event stream.
    ///
    /// Leaf indices must read `0, 1, 2, ...` in stream order; anything else
    /// means the stream was reordered or has gaps.
    pub fn from_events<'a, I>(events: I, round_id: u64) -> Result<Self>
    where
        I: IntoIterator<Item = &'a BallotEvent>,
    {
        let mut commitments = Vec::new();
        let mut frozen_root = None;

        for event in events {
            match event {
                BallotEvent::CommitmentRegistered { round_id: id, leaf_index, commitment }
                    if *id == round_id =>
                {
                    let expected = commitments.len() as u64;
                    if *leaf_index != expected || frozen_root.is_some() {
                        return Err(VouchError::LogOutOfOrder { expected, found: *leaf_index });
                    }
                    commitments.push(*commitment);
                }
                BallotEvent::RegistrationClosed { round_id: id, root } if *id == round_id => {
                    if frozen_root.is_some() {
                        let closed_at = commitments.len() as u64;
                        return Err(VouchError::LogOutOfOrder {
                            expected: closed_at,
                            found: closed_at,
                        });
                    }
                    frozen_root = Some(*root);
                }
                _ => {}
            }
        }

        Ok(Self { round_id, commitments, frozen_root })
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn commitments(&self) -> &[Commitment] {
        &self.commitments
    }

    pub fn frozen_root(&self) -> Option<MerkleRoot> {
        self.frozen_root
    }

    pub fn is_closed(&self) -> bool {
        self.frozen_root.is_some()
    }

    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}

//! A single live round
//!
//! Everything a round accretes lives here, so starting a new round or
//! finishing one replaces the whole value instead of clearing fields.

use std::collections::HashSet;
use vouch_runtime::{
    Accumulator, Address, Commitment, MerkleRoot, NullifierHash, Result, Stage, VouchError,
};

#[derive(Debug, Clone)]
pub struct Round {
    id: u64,
    candidates: Vec<Address>,
    deadline: u64,
    stage: Stage,
    accumulator: Accumulator,
    registered: HashSet<Address>,
    nullifiers: HashSet<NullifierHash>,
    tally: Vec<u64>,
    frozen_root: Option<MerkleRoot>,
}

impl Round {
    /// A fresh round in `Registration` with an empty tree of `tree_depth`.
    pub fn new(
        id: u64,
        candidates: Vec<Address>,
        timeout: u64,
        now: u64,
        tree_depth: u32,
    ) -> Result<Self> {
        let accumulator = Accumulator::new(tree_depth)?;
        let tally = vec![0; candidates.len()];

        Ok(Self {
            id,
            candidates,
            deadline: now.saturating_add(timeout),
            stage: Stage::Registration,
            accumulator,
            registered: HashSet::new(),
            nullifiers: HashSet::new(),
            tally,
            frozen_root: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn candidates(&self) -> &[Address] {
        &self.candidates
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn tally(&self) -> &[u64] {
        &self.tally
    }

    pub fn frozen_root(&self) -> Option<MerkleRoot> {
        self.frozen_root
    }

    pub fn is_registered(&self, voucher: &Address) -> bool {
        self.registered.contains(voucher)
    }

    pub fn is_revealed(&self, nullifier_hash: &NullifierHash) -> bool {
        self.nullifiers.contains(nullifier_hash)
    }

    pub fn revealed_count(&self) -> u64 {
        self.nullifiers.len() as u64
    }

    /// Candidate with the strictly greatest tally; ties go to the earliest.
    pub fn winner(&self) -> Address {
        let mut best = 0;
        for (index, &count) in self.tally.iter().enumerate() {
            if count > self.tally[best] {
                best = index;
            }
        }
        self.candidates[best]
    }

    pub(crate) fn ensure_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(VouchError::WrongStage { expected, actual: self.stage });
        }
        Ok(())
    }

    /// Insert for `voucher`; the tree and the registered set move together.
    pub(crate) fn register(&mut self, voucher: Address, commitment: Commitment) -> Result<u64> {
        let leaf_index = self.accumulator.insert(commitment)?;
        self.registered.insert(voucher);
        Ok(leaf_index)
    }

    pub(crate) fn freeze(&mut self) -> MerkleRoot {
        let root = self.accumulator.root();
        self.frozen_root = Some(root);
        self.stage = Stage::Tally;
        root
    }

    pub(crate) fn record_reveal(&mut self, nullifier_hash: NullifierHash, vote: u32) {
        self.nullifiers.insert(nullifier_hash);
        self.tally[vote as usize] += 1;
    }
}

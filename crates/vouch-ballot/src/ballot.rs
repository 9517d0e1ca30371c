//! The ballot state machine
//!
//! `Idle → Registration → Tally → Idle`. Every operation evaluates all of its
//! guards before writing anything, so an error always leaves the ballot
//! exactly as it found it. In `reveal` the proof check is the last guard:
//! the nullifier and the tally are only touched once it has passed.

use crate::clock::{Clock, SystemClock};
use crate::events::BallotEvent;
use crate::registry::{VouchRecord, VoucherRegistry};
use crate::round::Round;
use crate::verifier::VouchVerifier;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use vouch_runtime::{
    Address, BallotConfig, Commitment, MerkleRoot, NullifierHash, PublicInputs, Result, Stage,
    VouchError, VouchProof,
};

pub struct BallotStateMachine<V, C = SystemClock> {
    admin: Address,
    tree_depth: u32,
    candidate_count: usize,
    registry: VoucherRegistry,
    record: VouchRecord,
    verifier: V,
    clock: C,
    round: Option<Round>,
    last_round_id: u64,
    events: Vec<BallotEvent>,
}

impl<V: VouchVerifier> BallotStateMachine<V, SystemClock> {
    pub fn with_system_clock(config: BallotConfig, verifier: V) -> Result<Self> {
        Self::new(config, verifier, SystemClock)
    }
}

impl<V: VouchVerifier, C: Clock> BallotStateMachine<V, C> {
    /// Build an idle ballot. The configuration is validated and then fixed.
    pub fn new(config: BallotConfig, verifier: V, clock: C) -> Result<Self> {
        config.validate()?;
        let registry = VoucherRegistry::new(config.vouchers);

        info!(
            admin = %config.admin,
            vouchers = registry.len(),
            tree_depth = config.tree_depth,
            "ballot deployed"
        );

        Ok(Self {
            admin: config.admin,
            tree_depth: config.tree_depth,
            candidate_count: config.candidate_count,
            registry,
            record: VouchRecord::default(),
            verifier,
            clock,
            round: None,
            last_round_id: 0,
            events: Vec::new(),
        })
    }

    /// Open a round for `candidates`, closing for registration `timeout`
    /// seconds from now. Returns the new round id.
    pub fn start_round(
        &mut self,
        caller: &Address,
        candidates: Vec<Address>,
        timeout: u64,
    ) -> Result<u64> {
        self.try_start_round(caller, candidates, timeout)
            .inspect_err(|err| warn!(%caller, %err, "start_round rejected"))
    }

    fn try_start_round(
        &mut self,
        caller: &Address,
        candidates: Vec<Address>,
        timeout: u64,
    ) -> Result<u64> {
        self.ensure_admin(caller)?;
        if let Some(round) = &self.round {
            return Err(VouchError::WrongStage { expected: Stage::Idle, actual: round.stage() });
        }
        if candidates.len() != self.candidate_count {
            return Err(VouchError::invalid_candidates(format!(
                "expected {} candidates, got {}",
                self.candidate_count,
                candidates.len()
            )));
        }
        let unique: HashSet<&Address> = candidates.iter().collect();
        if unique.len() != candidates.len() {
            return Err(VouchError::invalid_candidates("duplicate candidate"));
        }

        let round_id = self.last_round_id + 1;
        let round =
            Round::new(round_id, candidates.clone(), timeout, self.clock.now(), self.tree_depth)?;

        info!(round_id, deadline = round.deadline(), "round started");

        self.last_round_id = round_id;
        self.round = Some(round);
        self.events.push(BallotEvent::RoundStarted { round_id, candidates, timeout });

        Ok(round_id)
    }

    /// Add `caller`'s commitment to the round's tree. Returns its leaf index.
    pub fn register_commitment(&mut self, caller: &Address, commitment: Commitment) -> Result<u64> {
        self.try_register_commitment(caller, commitment)
            .inspect_err(|err| warn!(%caller, %err, "register_commitment rejected"))
    }

    fn try_register_commitment(&mut self, caller: &Address, commitment: Commitment) -> Result<u64> {
        if !self.registry.contains(caller) {
            return Err(VouchError::unauthorized(format!("{} is not a registered voucher", caller)));
        }
        let round = self.round_in_mut(Stage::Registration)?;
        if round.is_registered(caller) {
            return Err(VouchError::AlreadyRegistered);
        }

        let leaf_index = round.register(*caller, commitment)?;
        let round_id = round.id();

        debug!(round_id, leaf_index, %commitment, "commitment registered");
        self.events.push(BallotEvent::CommitmentRegistered { round_id, leaf_index, commitment });

        Ok(leaf_index)
    }

    /// Freeze the tree once the deadline has passed. Open to any caller.
    pub fn close_registration(&mut self, caller: &Address) -> Result<MerkleRoot> {
        self.try_close_registration()
            .inspect_err(|err| warn!(%caller, %err, "close_registration rejected"))
    }

    fn try_close_registration(&mut self) -> Result<MerkleRoot> {
        let now = self.clock.now();
        let round = self.round_in_mut(Stage::Registration)?;
        if now < round.deadline() {
            return Err(VouchError::DeadlineNotReached { now, deadline: round.deadline() });
        }

        let root = round.freeze();
        let round_id = round.id();

        info!(round_id, %root, leaves = round.accumulator().len(), "registration closed");
        self.events.push(BallotEvent::RegistrationClosed { round_id, root });

        Ok(root)
    }

    /// Count one anonymous vote for `vote`, gated on a membership proof
    /// against the frozen root.
    pub fn reveal(
        &mut self,
        caller: &Address,
        vote: u32,
        nullifier_hash: NullifierHash,
        root: MerkleRoot,
        proof: &VouchProof,
    ) -> Result<()> {
        self.try_reveal(caller, vote, nullifier_hash, root, proof)
            .inspect_err(|err| warn!(%nullifier_hash, %err, "reveal rejected"))
    }

    fn try_reveal(
        &mut self,
        caller: &Address,
        vote: u32,
        nullifier_hash: NullifierHash,
        root: MerkleRoot,
        proof: &VouchProof,
    ) -> Result<()> {
        self.ensure_admin(caller)?;
        let round = self.round_in(Stage::Tally)?;
        if vote as usize >= round.candidates().len() {
            return Err(VouchError::InvalidVote { vote, candidates: round.candidates().len() });
        }
        if round.frozen_root() != Some(root) {
            return Err(VouchError::StaleRoot);
        }
        if round.is_revealed(&nullifier_hash) {
            return Err(VouchError::AlreadyRevealed);
        }
        // Reveals never outnumber leaves
        let commitments = round.accumulator().len();
        if round.revealed_count() >= commitments {
            return Err(VouchError::RevealsExhausted { commitments });
        }

        let inputs = PublicInputs { root, nullifier_hash, vote, round_id: round.id() };
        if !self.verifier.verify(proof, &inputs) {
            return Err(VouchError::invalid_proof("membership proof rejected"));
        }

        let round = self.round_in_mut(Stage::Tally)?;
        round.record_reveal(nullifier_hash, vote);

        info!(round_id = inputs.round_id, vote, "vote revealed");
        self.events.push(BallotEvent::VoteRevealed {
            round_id: inputs.round_id,
            nullifier_hash,
            vote,
        });

        Ok(())
    }

    /// Close the round, record its winner and return to `Idle`.
    pub fn finalize(&mut self, caller: &Address) -> Result<Address> {
        self.try_finalize(caller).inspect_err(|err| warn!(%caller, %err, "finalize rejected"))
    }

    fn try_finalize(&mut self, caller: &Address) -> Result<Address> {
        self.ensure_admin(caller)?;
        let round = self.round_in(Stage::Tally)?;
        let round_id = round.id();
        let winner = round.winner();

        info!(round_id, %winner, tally = ?round.tally(), "round finished");

        self.record.mark_won(winner);
        self.round = None;
        self.events.push(BallotEvent::RoundFinished { round_id, winner });

        Ok(winner)
    }

    pub fn current_stage(&self) -> Stage {
        self.round.as_ref().map_or(Stage::Idle, Round::stage)
    }

    pub fn has_won(&self, candidate: &Address) -> bool {
        self.record.has_won(candidate)
    }

    /// Id of the live round, if any.
    pub fn current_round_id(&self) -> Option<u64> {
        self.round.as_ref().map(Round::id)
    }

    pub fn frozen_root(&self) -> Option<MerkleRoot> {
        self.round.as_ref().and_then(Round::frozen_root)
    }

    /// Root of the live tree, frozen or not.
    pub fn current_root(&self) -> Option<MerkleRoot> {
        self.round.as_ref().map(|round| round.accumulator().root())
    }

    pub fn tally(&self) -> Option<&[u64]> {
        self.round.as_ref().map(Round::tally)
    }

    pub fn candidates(&self) -> Option<&[Address]> {
        self.round.as_ref().map(Round::candidates)
    }

    pub fn deadline(&self) -> Option<u64> {
        self.round.as_ref().map(Round::deadline)
    }

    /// Whether `voucher` has already committed in the live round.
    pub fn is_registered(&self, voucher: &Address) -> bool {
        self.round.as_ref().is_some_and(|round| round.is_registered(voucher))
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn events(&self) -> &[BallotEvent] {
        &self.events
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    pub fn registry(&self) -> &VoucherRegistry {
        &self.registry
    }

    pub fn record(&self) -> &VouchRecord {
        &self.record
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.admin {
            return Err(VouchError::unauthorized(format!("{} is not the round administrator", caller)));
        }
        Ok(())
    }

    fn round_in(&self, expected: Stage) -> Result<&Round> {
        let round = self
            .round
            .as_ref()
            .ok_or(VouchError::WrongStage { expected, actual: Stage::Idle })?;
        round.ensure_stage(expected)?;
        Ok(round)
    }

    fn round_in_mut(&mut self, expected: Stage) -> Result<&mut Round> {
        let round = self
            .round
            .as_mut()
            .ok_or(VouchError::WrongStage { expected, actual: Stage::Idle })?;
        round.ensure_stage(expected)?;
        Ok(round)
    }
}

//! State machine scenarios with a stand-in verifier
//!
//! The stand-in accepts a proof iff its bytes are the JSON of the public
//! inputs, which is enough to bind root, nullifier hash, vote and round
//! without running the prover. Real proofs are exercised by the mirror's
//! end-to-end tests.

use std::cell::Cell;
use std::rc::Rc;
use vouch_ballot::{BallotEvent, BallotStateMachine, Clock, ManualClock, VouchVerifier};
use vouch_runtime::{
    Address, BallotConfig, Commitment, Fp, MerkleRoot, NullifierHash, PublicInputs, Stage,
    VouchError, VouchProof,
};

const TIMEOUT: u64 = 600;

fn admin() -> Address {
    Address::from_low_u64(1)
}

fn voucher(n: u64) -> Address {
    Address::from_low_u64(10 + n)
}

fn candidate_x() -> Address {
    Address::from_low_u64(100)
}

fn candidate_y() -> Address {
    Address::from_low_u64(101)
}

fn stand_in_proof(inputs: &PublicInputs) -> VouchProof {
    VouchProof::new(serde_json::to_vec(inputs).unwrap())
}

fn stand_in_verify(proof: &VouchProof, inputs: &PublicInputs) -> bool {
    serde_json::to_vec(inputs).map(|bytes| bytes == proof.as_bytes()).unwrap_or(false)
}

type StandIn = fn(&VouchProof, &PublicInputs) -> bool;

fn setup_with(
    vouchers: u64,
    tree_depth: u32,
) -> (BallotStateMachine<StandIn, ManualClock>, ManualClock) {
    let clock = ManualClock::new(1_700_000_000);
    let config = BallotConfig::new(admin(), (0..vouchers).map(voucher).collect())
        .with_tree_depth(tree_depth);
    let ballot = BallotStateMachine::new(config, stand_in_verify as StandIn, clock.clone()).unwrap();
    (ballot, clock)
}

fn setup() -> (BallotStateMachine<StandIn, ManualClock>, ManualClock) {
    setup_with(3, 20)
}

/// Register one commitment per entry, then close registration.
fn run_registration<V: VouchVerifier>(
    ballot: &mut BallotStateMachine<V, ManualClock>,
    clock: &ManualClock,
    commitments: &[(Address, u64)],
) -> MerkleRoot {
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    for (who, value) in commitments {
        ballot.register_commitment(who, Commitment::new(Fp::from(*value))).unwrap();
    }
    clock.advance(TIMEOUT);
    ballot.close_registration(&voucher(0)).unwrap()
}

fn reveal_for<V: VouchVerifier>(
    ballot: &mut BallotStateMachine<V, ManualClock>,
    vote: u32,
    nullifier: u64,
    root: MerkleRoot,
) -> Result<(), VouchError> {
    let nullifier_hash = NullifierHash::new(Fp::from(nullifier));
    let round_id = ballot.current_round_id().unwrap_or_default();
    let proof = stand_in_proof(&PublicInputs { root, nullifier_hash, vote, round_id });
    ballot.reveal(&admin(), vote, nullifier_hash, root, &proof)
}

#[test]
fn test_reference_scenario() {
    let (mut ballot, clock) = setup();
    let root = run_registration(
        &mut ballot,
        &clock,
        &[(voucher(0), 1_001), (voucher(1), 1_002), (voucher(2), 1_003)],
    );
    assert_eq!(ballot.current_stage(), Stage::Tally);

    // A and B vote Y, C votes X
    reveal_for(&mut ballot, 1, 1, root).unwrap();
    reveal_for(&mut ballot, 1, 2, root).unwrap();
    reveal_for(&mut ballot, 0, 3, root).unwrap();
    assert_eq!(ballot.current_stage(), Stage::Tally);
    assert_eq!(ballot.tally(), Some(&[1, 2][..]));

    let winner = ballot.finalize(&admin()).unwrap();
    assert_eq!(winner, candidate_y());
    assert!(ballot.has_won(&candidate_y()));
    assert!(!ballot.has_won(&candidate_x()));
    assert_eq!(ballot.current_stage(), Stage::Idle);
    assert_eq!(
        ballot.events().last(),
        Some(&BallotEvent::RoundFinished { round_id: 1, winner: candidate_y() })
    );
}

#[test]
fn test_event_log_order() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 5), (voucher(1), 6)]);
    reveal_for(&mut ballot, 0, 1, root).unwrap();
    ballot.finalize(&admin()).unwrap();

    let events = ballot.events();
    assert_eq!(events.len(), 6);
    assert_eq!(
        events[0],
        BallotEvent::RoundStarted {
            round_id: 1,
            candidates: vec![candidate_x(), candidate_y()],
            timeout: TIMEOUT,
        }
    );
    assert_eq!(
        events[1],
        BallotEvent::CommitmentRegistered {
            round_id: 1,
            leaf_index: 0,
            commitment: Commitment::new(Fp::from(5)),
        }
    );
    assert_eq!(
        events[2],
        BallotEvent::CommitmentRegistered {
            round_id: 1,
            leaf_index: 1,
            commitment: Commitment::new(Fp::from(6)),
        }
    );
    assert_eq!(events[3], BallotEvent::RegistrationClosed { round_id: 1, root });
    assert!(matches!(events[4], BallotEvent::VoteRevealed { vote: 0, .. }));
    assert!(matches!(events[5], BallotEvent::RoundFinished { .. }));
}

#[test]
fn test_duplicate_nullifier_rejected() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 7), (voucher(1), 8)]);

    reveal_for(&mut ballot, 1, 42, root).unwrap();
    let events_before = ballot.events().len();

    let err = reveal_for(&mut ballot, 1, 42, root).unwrap_err();
    assert!(matches!(err, VouchError::AlreadyRevealed));

    // Declaring another vote does not help either
    let err = reveal_for(&mut ballot, 0, 42, root).unwrap_err();
    assert!(matches!(err, VouchError::AlreadyRevealed));

    assert_eq!(ballot.tally(), Some(&[0, 1][..]));
    assert_eq!(ballot.events().len(), events_before);
}

#[test]
fn test_unregistered_voucher_rejected() {
    let (mut ballot, _clock) = setup();
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    let root_before = ballot.current_root();

    let outsider = Address::from_low_u64(999);
    let err = ballot.register_commitment(&outsider, Commitment::new(Fp::from(1))).unwrap_err();

    assert!(matches!(err, VouchError::Unauthorized(_)));
    assert_eq!(ballot.current_root(), root_before);
    assert_eq!(ballot.round().unwrap().accumulator().len(), 0);
    assert!(!ballot.is_registered(&outsider));
}

#[test]
fn test_unregistered_voucher_rejected_in_any_stage() {
    let (mut ballot, _clock) = setup();

    let err = ballot
        .register_commitment(&Address::from_low_u64(999), Commitment::new(Fp::from(1)))
        .unwrap_err();
    assert!(matches!(err, VouchError::Unauthorized(_)));
}

#[test]
fn test_double_registration_rejected() {
    let (mut ballot, _clock) = setup();
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();

    assert_eq!(ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(1))).unwrap(), 0);
    let err = ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(2))).unwrap_err();

    assert!(matches!(err, VouchError::AlreadyRegistered));
    assert_eq!(ballot.round().unwrap().accumulator().len(), 1);
    assert!(ballot.is_registered(&voucher(0)));
}

#[test]
fn test_wrong_stage_operations() {
    let (mut ballot, clock) = setup();
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(1))).unwrap();
    let live_root = ballot.current_root().unwrap();

    let err = reveal_for(&mut ballot, 0, 1, live_root).unwrap_err();
    assert!(matches!(
        err,
        VouchError::WrongStage { expected: Stage::Tally, actual: Stage::Registration }
    ));

    let err = ballot.finalize(&admin()).unwrap_err();
    assert!(matches!(err, VouchError::WrongStage { actual: Stage::Registration, .. }));

    let err = ballot
        .start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT)
        .unwrap_err();
    assert!(matches!(
        err,
        VouchError::WrongStage { expected: Stage::Idle, actual: Stage::Registration }
    ));

    clock.advance(TIMEOUT);
    ballot.close_registration(&voucher(1)).unwrap();

    let err = ballot.register_commitment(&voucher(1), Commitment::new(Fp::from(2))).unwrap_err();
    assert!(matches!(
        err,
        VouchError::WrongStage { expected: Stage::Registration, actual: Stage::Tally }
    ));
}

#[test]
fn test_close_registration_deadline() {
    let (mut ballot, clock) = setup();
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(1))).unwrap();

    clock.advance(TIMEOUT - 1);
    let err = ballot.close_registration(&voucher(2)).unwrap_err();
    assert!(matches!(err, VouchError::DeadlineNotReached { .. }));
    assert_eq!(ballot.current_stage(), Stage::Registration);
    assert_eq!(ballot.frozen_root(), None);

    clock.advance(1);
    let root = ballot.close_registration(&voucher(2)).unwrap();
    assert_eq!(ballot.frozen_root(), Some(root));

    // Exactly once per round
    let err = ballot.close_registration(&voucher(2)).unwrap_err();
    assert!(matches!(err, VouchError::WrongStage { .. }));

    reveal_for(&mut ballot, 0, 9, root).unwrap();
    assert_eq!(ballot.frozen_root(), Some(root));
}

#[test]
fn test_close_registration_open_to_anyone() {
    let (mut ballot, clock) = setup();
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    clock.advance(TIMEOUT);

    assert!(ballot.close_registration(&Address::from_low_u64(12345)).is_ok());
}

#[test]
fn test_tree_full_only_on_overflow() {
    // Depth 1 holds two leaves
    let (mut ballot, _clock) = setup_with(3, 1);
    ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();

    ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(1))).unwrap();
    ballot.register_commitment(&voucher(1), Commitment::new(Fp::from(2))).unwrap();
    let root_before = ballot.current_root();

    let err = ballot.register_commitment(&voucher(2), Commitment::new(Fp::from(3))).unwrap_err();
    assert!(matches!(err, VouchError::TreeFull { capacity: 2 }));

    let accumulator = ballot.round().unwrap().accumulator();
    assert_eq!(accumulator.len(), 2);
    assert_eq!(accumulator.leaf(0), Some(Commitment::new(Fp::from(1))));
    assert_eq!(accumulator.leaf(1), Some(Commitment::new(Fp::from(2))));
    assert_eq!(ballot.current_root(), root_before);
    assert!(!ballot.is_registered(&voucher(2)));
}

#[test]
fn test_invalid_proof_leaves_state_unchanged() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1), (voucher(1), 2)]);
    let nullifier_hash = NullifierHash::new(Fp::from(77));

    // Proof made for a different nullifier hash
    let forged = stand_in_proof(&PublicInputs {
        root,
        nullifier_hash: NullifierHash::new(Fp::from(78)),
        vote: 1,
        round_id: 1,
    });
    let err = ballot.reveal(&admin(), 1, nullifier_hash, root, &forged).unwrap_err();

    assert!(matches!(err, VouchError::InvalidProof(_)));
    assert_eq!(ballot.tally(), Some(&[0, 0][..]));
    assert!(!ballot.round().unwrap().is_revealed(&nullifier_hash));

    // Still eligible with a good proof
    reveal_for(&mut ballot, 1, 77, root).unwrap();
    assert_eq!(ballot.tally(), Some(&[0, 1][..]));
}

#[test]
fn test_stale_root_rejected() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);
    let stale = MerkleRoot::new(Fp::from(123));
    assert_ne!(root, stale);

    let err = reveal_for(&mut ballot, 0, 1, stale).unwrap_err();
    assert!(matches!(err, VouchError::StaleRoot));
}

#[test]
fn test_out_of_range_vote_rejected() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);

    let err = reveal_for(&mut ballot, 2, 1, root).unwrap_err();
    assert!(matches!(err, VouchError::InvalidVote { vote: 2, candidates: 2 }));
}

#[test]
fn test_guards_run_before_verifier() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = calls.clone();
    let verifier = move |proof: &VouchProof, inputs: &PublicInputs| {
        counter.set(counter.get() + 1);
        stand_in_verify(proof, inputs)
    };

    let clock = ManualClock::new(0);
    let config = BallotConfig::new(admin(), vec![voucher(0)]).with_tree_depth(4);
    let mut ballot = BallotStateMachine::new(config, verifier, clock.clone()).unwrap();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);

    assert!(reveal_for(&mut ballot, 0, 1, MerkleRoot::new(Fp::from(5))).is_err());
    assert!(reveal_for(&mut ballot, 9, 1, root).is_err());
    assert_eq!(calls.get(), 0);

    reveal_for(&mut ballot, 0, 1, root).unwrap();
    assert_eq!(calls.get(), 1);

    assert!(matches!(reveal_for(&mut ballot, 0, 1, root), Err(VouchError::AlreadyRevealed)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_admin_only_operations() {
    let (mut ballot, clock) = setup();
    let intruder = voucher(0);

    let err = ballot
        .start_round(&intruder, vec![candidate_x(), candidate_y()], TIMEOUT)
        .unwrap_err();
    assert!(matches!(err, VouchError::Unauthorized(_)));
    assert_eq!(ballot.current_stage(), Stage::Idle);

    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);
    let nullifier_hash = NullifierHash::new(Fp::from(1));
    let proof = stand_in_proof(&PublicInputs { root, nullifier_hash, vote: 0, round_id: 1 });

    let err = ballot.reveal(&intruder, 0, nullifier_hash, root, &proof).unwrap_err();
    assert!(matches!(err, VouchError::Unauthorized(_)));

    let err = ballot.finalize(&intruder).unwrap_err();
    assert!(matches!(err, VouchError::Unauthorized(_)));
    assert_eq!(ballot.current_stage(), Stage::Tally);
}

#[test]
fn test_tie_goes_to_first_candidate() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1), (voucher(1), 2)]);

    reveal_for(&mut ballot, 1, 1, root).unwrap();
    reveal_for(&mut ballot, 0, 2, root).unwrap();

    assert_eq!(ballot.finalize(&admin()).unwrap(), candidate_x());
    assert!(ballot.has_won(&candidate_x()));
}

#[test]
fn test_finalize_without_reveals_picks_first_candidate() {
    let (mut ballot, clock) = setup();
    run_registration(&mut ballot, &clock, &[]);

    assert_eq!(ballot.finalize(&admin()).unwrap(), candidate_x());
    assert!(ballot.has_won(&candidate_x()));
    assert!(!ballot.has_won(&candidate_y()));
    assert_eq!(ballot.current_stage(), Stage::Idle);
}

#[test]
fn test_rounds_reset_between_runs() {
    let (mut ballot, clock) = setup();
    let first_root = run_registration(&mut ballot, &clock, &[(voucher(0), 1), (voucher(1), 2)]);
    reveal_for(&mut ballot, 1, 50, first_root).unwrap();
    ballot.finalize(&admin()).unwrap();

    let second = ballot.start_round(&admin(), vec![candidate_x(), candidate_y()], TIMEOUT).unwrap();
    assert_eq!(second, 2);
    assert_eq!(ballot.current_round_id(), Some(2));
    assert_eq!(ballot.tally(), Some(&[0, 0][..]));
    assert!(!ballot.is_registered(&voucher(0)));
    assert_eq!(ballot.frozen_root(), None);
    assert_eq!(ballot.round().unwrap().accumulator().len(), 0);
    assert_eq!(ballot.deadline(), Some(clock.now() + TIMEOUT));

    // The same voucher may commit again
    ballot.register_commitment(&voucher(0), Commitment::new(Fp::from(1))).unwrap();
    ballot.register_commitment(&voucher(1), Commitment::new(Fp::from(2))).unwrap();
    clock.advance(TIMEOUT);
    let second_root = ballot.close_registration(&voucher(0)).unwrap();
    assert_eq!(second_root, first_root);

    // Nullifier use is scoped to a round
    reveal_for(&mut ballot, 0, 50, second_root).unwrap();
    assert_eq!(ballot.finalize(&admin()).unwrap(), candidate_x());

    assert!(ballot.has_won(&candidate_x()));
    assert!(ballot.has_won(&candidate_y()));
}

#[test]
fn test_proof_bound_to_round() {
    let (mut ballot, clock) = setup();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);
    ballot.finalize(&admin()).unwrap();
    run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);

    let nullifier_hash = NullifierHash::new(Fp::from(3));
    let round_one_proof =
        stand_in_proof(&PublicInputs { root, nullifier_hash, vote: 0, round_id: 1 });
    let err = ballot.reveal(&admin(), 0, nullifier_hash, root, &round_one_proof).unwrap_err();

    assert!(matches!(err, VouchError::InvalidProof(_)));
}

#[test]
fn test_reveals_never_exceed_commitments() {
    let accept_all = |_: &VouchProof, _: &PublicInputs| true;
    let clock = ManualClock::new(0);
    let config = BallotConfig::new(admin(), vec![voucher(0), voucher(1)]).with_tree_depth(4);
    let mut ballot = BallotStateMachine::new(config, accept_all, clock.clone()).unwrap();
    let root = run_registration(&mut ballot, &clock, &[(voucher(0), 1)]);

    reveal_for(&mut ballot, 1, 1, root).unwrap();
    let events_before = ballot.events().len();

    for nullifier in 2..6 {
        let err = reveal_for(&mut ballot, 1, nullifier, root).unwrap_err();
        assert!(matches!(err, VouchError::RevealsExhausted { commitments: 1 }));
    }

    let round = ballot.round().unwrap();
    assert_eq!(round.revealed_count(), round.accumulator().len());
    assert_eq!(ballot.tally().unwrap().iter().sum::<u64>(), 1);
    assert!(!round.is_revealed(&NullifierHash::new(Fp::from(2))));
    assert_eq!(ballot.events().len(), events_before);
}

#[test]
fn test_empty_round_accepts_no_reveal() {
    let accept_all = |_: &VouchProof, _: &PublicInputs| true;
    let clock = ManualClock::new(0);
    let config = BallotConfig::new(admin(), vec![voucher(0)]).with_tree_depth(4);
    let mut ballot = BallotStateMachine::new(config, accept_all, clock.clone()).unwrap();
    let root = run_registration(&mut ballot, &clock, &[]);

    let err = reveal_for(&mut ballot, 0, 1, root).unwrap_err();
    assert!(matches!(err, VouchError::RevealsExhausted { commitments: 0 }));
    assert_eq!(ballot.tally(), Some(&[0, 0][..]));
}

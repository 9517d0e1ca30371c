//! Vouch Ballot Demo
//!
//! Runs one round end to end:
//! 1. Deploy a ballot with three vouchers and halo2 verifying material
//! 2. Each voucher commits to a candidate
//! 3. Registration closes and the root is frozen
//! 4. The mirror replays the log and builds a reveal proof per voucher
//! 5. Reveals are tallied and the round is finalized
//!
//! Set `RUST_LOG=debug` to watch the state machine's transitions.

use rand::rngs::OsRng;
use tracing_subscriber::EnvFilter;
use vouch_ballot::{BallotStateMachine, Halo2VouchVerifier, ManualClock};
use vouch_circuit::{KeyManager, VouchProver};
use vouch_mirror::{check_root, generate_commitment, OffchainMirrorProver, RoundEventLog};
use vouch_runtime::{Address, BallotConfig};

const TREE_DEPTH: u32 = 8;
const TIMEOUT: u64 = 600;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("\n=== Vouch Ballot Demo ===\n");

    let admin = Address::from_low_u64(1);
    let vouchers = [Address::from_low_u64(2), Address::from_low_u64(3), Address::from_low_u64(4)];
    let candidates = vec![Address::from_low_u64(100), Address::from_low_u64(101)];

    println!("STEP 1: Key generation (depth {})", TREE_DEPTH);
    println!("────────────────────────────────");
    let cache = tempfile::tempdir()?;
    let key_manager = KeyManager::new(cache.path())?;
    let prover = VouchProver::setup(&key_manager, TREE_DEPTH, None)?;
    println!("  Circuit size: k = {}", prover.k());

    let clock = ManualClock::new(1_700_000_000);
    let config = BallotConfig::new(admin, vouchers.to_vec()).with_tree_depth(TREE_DEPTH);
    let verifier = Halo2VouchVerifier::from_prover(&prover);
    let mut ballot = BallotStateMachine::new(config, verifier, clock.clone())?;
    let mirror = OffchainMirrorProver::new(prover);
    println!();

    println!("STEP 2: Registration");
    println!("────────────────────");
    let round_id = ballot.start_round(&admin, candidates.clone(), TIMEOUT)?;
    let votes = [1u32, 1, 0];
    let mut secrets = Vec::new();
    for (voucher, vote) in vouchers.iter().zip(votes) {
        let secret = generate_commitment(vote, &mut OsRng);
        let leaf = ballot.register_commitment(voucher, secret.commitment())?;
        println!("  {} -> leaf {} ({})", voucher, leaf, secret.commitment());
        secrets.push(secret);
    }
    println!();

    println!("STEP 3: Close registration");
    println!("──────────────────────────");
    clock.advance(TIMEOUT);
    let root = ballot.close_registration(&vouchers[0])?;
    println!("  Frozen root: {}", root);
    println!();

    println!("STEP 4: Reveal");
    println!("──────────────");
    let log = RoundEventLog::from_events(ballot.events(), round_id)?;
    for secret in &secrets {
        let bundle = mirror.build_proof(&log, secret)?;
        check_root(&bundle, root)?;
        ballot.reveal(&admin, bundle.vote, bundle.nullifier_hash, bundle.root, &bundle.proof)?;
        println!("  vote {} accepted ({} byte proof)", bundle.vote, bundle.proof.size());
    }
    println!("  Tally: {:?}", ballot.tally().unwrap_or_default());
    println!();

    println!("STEP 5: Finalize");
    println!("────────────────");
    let winner = ballot.finalize(&admin)?;
    println!("  Winner: {}", winner);
    println!("  has_won: {}", ballot.has_won(&winner));
    println!("  Stage: {}", ballot.current_stage());

    println!("\n=== Demo Complete ===\n");
    Ok(())
}

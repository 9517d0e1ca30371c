//! Off-chain replay and proof building
//!
//! Reads nothing but an immutable event log and the voucher's own secret, so
//! any number of these may run side by side against the same ballot.

use crate::commitment::VouchSecret;
use crate::log::RoundEventLog;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vouch_circuit::VouchProver;
use vouch_runtime::{
    Accumulator, Commitment, MerklePath, MerkleRoot, NullifierHash, ProverConfig, PublicInputs,
    Result, VouchError, VouchProof,
};

/// Local copy of a round's accumulator.
#[derive(Debug, Clone)]
pub struct MirrorTree {
    round_id: u64,
    accumulator: Accumulator,
}

impl MirrorTree {
    /// Insert the log's commitments in order into an empty tree of `depth`.
    pub fn replay(log: &RoundEventLog, depth: u32) -> Result<Self> {
        let mut accumulator = Accumulator::new(depth)?;
        for commitment in log.commitments() {
            accumulator.insert(*commitment)?;
        }

        debug!(round_id = log.round_id(), leaves = accumulator.len(), "replayed registration log");
        Ok(Self { round_id: log.round_id(), accumulator })
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn root(&self) -> MerkleRoot {
        self.accumulator.root()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Leaf index and authentication path of `commitment`.
    pub fn path_for(&self, commitment: &Commitment) -> Result<(u64, MerklePath)> {
        let index = self.accumulator.position(commitment).ok_or(VouchError::LeafNotFound)?;
        Ok((index, self.accumulator.path_to(index)?))
    }
}

/// Everything the ballot's `reveal` takes, minus the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealBundle {
    pub root: MerkleRoot,
    pub nullifier_hash: NullifierHash,
    pub vote: u32,
    pub round_id: u64,
    pub proof: VouchProof,
}

impl RevealBundle {
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            root: self.root,
            nullifier_hash: self.nullifier_hash,
            vote: self.vote,
            round_id: self.round_id,
        }
    }
}

/// Fails with `RootMismatch` unless `bundle` was built against `onchain_root`.
pub fn check_root(bundle: &RevealBundle, onchain_root: MerkleRoot) -> Result<()> {
    if bundle.root != onchain_root {
        return Err(VouchError::RootMismatch {
            expected: onchain_root.to_hex(),
            actual: bundle.root.to_hex(),
        });
    }
    Ok(())
}

pub struct OffchainMirrorProver {
    prover: VouchProver,
}

impl OffchainMirrorProver {
    pub fn new(prover: VouchProver) -> Self {
        Self { prover }
    }

    pub fn from_config(config: &ProverConfig) -> Result<Self> {
        let prover = VouchProver::from_config(config)
            .map_err(|e| VouchError::proving_error(format!("{:#}", e)))?;
        Ok(Self::new(prover))
    }

    pub fn prover(&self) -> &VouchProver {
        &self.prover
    }

    pub fn tree_depth(&self) -> u32 {
        self.prover.tree_depth()
    }

    /// Replay `log`, locate `secret`'s leaf and prove its membership under
    /// the round's frozen root.
    pub fn build_proof(&self, log: &RoundEventLog, secret: &VouchSecret) -> Result<RevealBundle> {
        let frozen_root = log.frozen_root().ok_or(VouchError::RoundNotClosed(log.round_id()))?;

        let tree = MirrorTree::replay(log, self.tree_depth())?;
        if tree.root() != frozen_root {
            return Err(VouchError::RootMismatch {
                expected: frozen_root.to_hex(),
                actual: tree.root().to_hex(),
            });
        }

        let (leaf_index, path) = tree.path_for(&secret.commitment())?;
        let witness = secret.witness(path);
        debug!(round_id = log.round_id(), leaf_index, "witness assembled");

        let (proof, inputs) = self
            .prover
            .prove(&witness, log.round_id())
            .map_err(|e| VouchError::proving_error(format!("{:#}", e)))?;

        if inputs.root != frozen_root {
            return Err(VouchError::RootMismatch {
                expected: frozen_root.to_hex(),
                actual: inputs.root.to_hex(),
            });
        }

        info!(round_id = inputs.round_id, size = proof.size(), "reveal bundle ready");

        Ok(RevealBundle {
            root: inputs.root,
            nullifier_hash: inputs.nullifier_hash,
            vote: inputs.vote,
            round_id: inputs.round_id,
            proof,
        })
    }
}

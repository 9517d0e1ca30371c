//! Private witness for a reveal proof

use halo2curves::pasta::Fp;
use serde::{Deserialize, Serialize};
use vouch_runtime::{
    commitment_hash, nullifier_hash, types::field_serde, Commitment, MerklePath,
    MerkleRoot, NullifierHash, PoseidonHasher, PublicInputs,
};

/// Everything the prover needs to show that `H(H(secret, nullifier), vote)`
/// sits in the tree under some root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchWitness {
    #[serde(with = "field_serde")]
    pub secret: Fp,
    #[serde(with = "field_serde")]
    pub nullifier: Fp,
    pub vote: u32,
    pub path: MerklePath,
}

impl VouchWitness {
    pub fn new(secret: Fp, nullifier: Fp, vote: u32, path: MerklePath) -> Self {
        Self { secret, nullifier, vote, path }
    }

    pub fn commitment(&self) -> Commitment {
        Commitment::new(commitment_hash(&PoseidonHasher, self.secret, self.nullifier, self.vote))
    }

    pub fn nullifier_hash(&self) -> NullifierHash {
        NullifierHash::new(nullifier_hash(&PoseidonHasher, self.nullifier))
    }

    /// Root the path leads to when started from this witness's commitment.
    pub fn root(&self) -> MerkleRoot {
        self.path.compute_root(self.commitment().inner(), &PoseidonHasher)
    }

    /// Public inputs a proof over this witness binds to.
    pub fn public_inputs(&self, round_id: u64) -> PublicInputs {
        PublicInputs {
            root: self.root(),
            nullifier_hash: self.nullifier_hash(),
            vote: self.vote,
            round_id,
        }
    }
}

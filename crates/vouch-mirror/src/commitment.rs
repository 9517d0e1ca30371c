//! Voucher-side secret material

use ff::Field;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vouch_circuit::VouchWitness;
use vouch_runtime::{
    commitment_hash, nullifier_hash, types::field_serde, Commitment, Fp, MerklePath,
    NullifierHash, PoseidonHasher, Result, VouchError,
};

/// What a voucher must keep private until reveal.
///
/// The commitment and nullifier hash are derived, never set independently,
/// so a loaded secret always matches the leaf it was registered as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredSecret", into = "StoredSecret")]
pub struct VouchSecret {
    secret: Fp,
    nullifier: Fp,
    vote: u32,
    commitment: Commitment,
    nullifier_hash: NullifierHash,
}

/// Draw a fresh secret and nullifier committing to `vote`.
pub fn generate_commitment<R: RngCore>(vote: u32, rng: &mut R) -> VouchSecret {
    VouchSecret::from_parts(Fp::random(&mut *rng), Fp::random(&mut *rng), vote)
}

impl VouchSecret {
    pub fn from_parts(secret: Fp, nullifier: Fp, vote: u32) -> Self {
        let commitment =
            Commitment::new(commitment_hash(&PoseidonHasher, secret, nullifier, vote));
        let nullifier_hash = NullifierHash::new(nullifier_hash(&PoseidonHasher, nullifier));

        Self { secret, nullifier, vote, commitment, nullifier_hash }
    }

    pub fn secret(&self) -> Fp {
        self.secret
    }

    pub fn nullifier(&self) -> Fp {
        self.nullifier
    }

    pub fn vote(&self) -> u32 {
        self.vote
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn nullifier_hash(&self) -> NullifierHash {
        self.nullifier_hash
    }

    pub fn witness(&self, path: MerklePath) -> VouchWitness {
        VouchWitness::new(self.secret, self.nullifier, self.vote, path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSecret {
    #[serde(with = "field_serde")]
    secret: Fp,
    #[serde(with = "field_serde")]
    nullifier: Fp,
    vote: u32,
    commitment: Commitment,
    nullifier_hash: NullifierHash,
}

impl TryFrom<StoredSecret> for VouchSecret {
    type Error = VouchError;

    fn try_from(stored: StoredSecret) -> Result<Self> {
        let derived = VouchSecret::from_parts(stored.secret, stored.nullifier, stored.vote);
        if derived.commitment != stored.commitment || derived.nullifier_hash != stored.nullifier_hash
        {
            return Err(VouchError::serialization_error(
                "stored commitment does not match secret material",
            ));
        }
        Ok(derived)
    }
}

impl From<VouchSecret> for StoredSecret {
    fn from(secret: VouchSecret) -> Self {
        Self {
            secret: secret.secret,
            nullifier: secret.nullifier,
            vote: secret.vote,
            commitment: secret.commitment,
            nullifier_hash: secret.nullifier_hash,
        }
    }
}

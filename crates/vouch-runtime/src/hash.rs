//! Two-to-one compression used for tree nodes, commitments and nullifiers
//!
//! The ballot, the off-chain mirror and the membership circuit must all hash
//! with the same permutation. [`PoseidonHasher`] is the native half of the
//! Poseidon chip used in `vouch-circuit`.

use ff::Field;
use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength, P128Pow5T3};
use halo2curves::pasta::Fp;

/// Deterministic `H: Field × Field → Field`.
pub trait FieldHasher {
    fn hash(&self, left: Fp, right: Fp) -> Fp;
}

/// Poseidon (width 3, rate 2, 128-bit security) over the Pallas base field.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHasher;

impl FieldHasher for PoseidonHasher {
    fn hash(&self, left: Fp, right: Fp) -> Fp {
        poseidon::Hash::<_, P128Pow5T3, ConstantLength<2>, 3, 2>::init().hash([left, right])
    }
}

/// Leaf for a voucher's secret material: `H(H(secret, nullifier), vote)`.
pub fn commitment_hash<H: FieldHasher>(hasher: &H, secret: Fp, nullifier: Fp, vote: u32) -> Fp {
    let inner = hasher.hash(secret, nullifier);
    hasher.hash(inner, Fp::from(u64::from(vote)))
}

/// Public nullifier token: `H(nullifier, 0)`.
pub fn nullifier_hash<H: FieldHasher>(hasher: &H, nullifier: Fp) -> Fp {
    hasher.hash(nullifier, Fp::ZERO)
}

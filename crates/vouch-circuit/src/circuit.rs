//! Vouch Membership Circuit
//!
//! Proves, without revealing which leaf, that the prover knows a secret and a
//! nullifier whose commitment for the declared vote is in the ballot's tree.
//!
//! ## Circuit Overview
//!
//! Public Inputs (instance column):
//! - root: Frozen Merkle root of the round
//! - nullifier_hash: H(nullifier, 0)
//! - vote: Declared candidate index
//! - round_id: Round the reveal belongs to
//!
//! Private Witnesses:
//! - secret, nullifier: Voucher's secret material
//! - siblings: Authentication path, one node per level
//! - directions: 1 when the current node is a right child
//!
//! Constraints:
//! 1. commitment == H(H(secret, nullifier), vote)
//! 2. nullifier_hash == H(nullifier, 0)
//! 3. Each direction is boolean: d * (1 - d) == 0
//! 4. Per level: (left, right) == d ? (sibling, node) : (node, sibling)
//! 5. Per level: node_next == H(left, right); the last node is the root

use halo2_gadgets::poseidon::{
    primitives::{ConstantLength, P128Pow5T3},
    Hash as PoseidonHash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    circuit::{AssignedCell, Chip, Layouter, SimpleFloorPlanner, Value},
    plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Expression, Instance, Selector},
    poly::Rotation,
};
use ff::Field;
use halo2curves::pasta::Fp;

use crate::witness::VouchWitness;

/// Instance rows, in the order of `PublicInputs::to_instance`.
pub const ROOT_ROW: usize = 0;
pub const NULLIFIER_HASH_ROW: usize = 1;
pub const VOTE_ROW: usize = 2;
pub const ROUND_ID_ROW: usize = 3;

/// Upper bound on the rows one Poseidon hash occupies in `Pow5Chip`.
const ROWS_PER_HASH: usize = 64;

/// Headroom for blinding rows and the witness region.
const ROW_MARGIN: usize = 16;

type Poseidon2 = PoseidonHash<Fp, Pow5Chip<Fp, 3, 2>, P128Pow5T3, ConstantLength<2>, 3, 2>;

/// Rows needed by a tree of the given depth: two hashes for the commitment,
/// one for the nullifier hash, and a swap row plus a hash per level.
pub fn rows_for_depth(depth: usize) -> usize {
    (depth + 3) * ROWS_PER_HASH + depth + ROW_MARGIN
}

/// Smallest circuit size parameter that fits a tree of the given depth.
pub fn k_for_depth(depth: usize) -> u32 {
    let rows = rows_for_depth(depth);
    let mut k = 1;
    while (1usize << k) < rows {
        k += 1;
    }
    k
}

#[derive(Clone, Debug)]
pub struct VouchConfig {
    advice: [Column<Advice>; 5],
    instance: Column<Instance>,
    s_swap: Selector,
    poseidon: Pow5Config<Fp, 3, 2>,
}

#[derive(Clone, Debug)]
pub struct VouchChip {
    config: VouchConfig,
}

impl Chip<Fp> for VouchChip {
    type Config = VouchConfig;
    type Loaded = ();

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn loaded(&self) -> &Self::Loaded {
        &()
    }
}

/// Witness cells loaded at the start of synthesis.
struct LoadedWitness {
    secret: AssignedCell<Fp, Fp>,
    nullifier: AssignedCell<Fp, Fp>,
    vote: AssignedCell<Fp, Fp>,
    round_id: AssignedCell<Fp, Fp>,
    zero: AssignedCell<Fp, Fp>,
}

impl VouchChip {
    pub fn construct(config: VouchConfig) -> Self {
        Self { config }
    }

    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        advice: [Column<Advice>; 5],
        instance: Column<Instance>,
    ) -> VouchConfig {
        for col in &advice {
            meta.enable_equality(*col);
        }
        meta.enable_equality(instance);

        // Poseidon capacity element and the zero padding are fixed constants
        let constants = meta.fixed_column();
        meta.enable_constant(constants);

        let rc_a = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        let rc_b = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        let poseidon = Pow5Chip::configure::<P128Pow5T3>(
            meta,
            [advice[0], advice[1], advice[2]],
            advice[3],
            rc_a,
            rc_b,
        );

        let s_swap = meta.selector();

        // Conditional swap: direction picks which side the current node sits on
        meta.create_gate("conditional_swap", |meta| {
            let s = meta.query_selector(s_swap);
            let node = meta.query_advice(advice[0], Rotation::cur());
            let sibling = meta.query_advice(advice[1], Rotation::cur());
            let direction = meta.query_advice(advice[2], Rotation::cur());
            let left = meta.query_advice(advice[3], Rotation::cur());
            let right = meta.query_advice(advice[4], Rotation::cur());
            let one = Expression::Constant(Fp::ONE);

            vec![
                s.clone() * direction.clone() * (one - direction.clone()),
                s.clone()
                    * (left - (node.clone() + direction.clone() * (sibling.clone() - node.clone()))),
                s * (right - (sibling.clone() + direction * (node - sibling))),
            ]
        });

        VouchConfig { advice, instance, s_swap, poseidon }
    }

    fn load_witness(
        &self,
        mut layouter: impl Layouter<Fp>,
        secret: Value<Fp>,
        nullifier: Value<Fp>,
        vote: Value<Fp>,
        round_id: Value<Fp>,
    ) -> Result<LoadedWitness, Error> {
        layouter.assign_region(
            || "witness",
            |mut region| {
                let advice = self.config.advice;
                Ok(LoadedWitness {
                    secret: region.assign_advice(|| "secret", advice[0], 0, || secret)?,
                    nullifier: region.assign_advice(|| "nullifier", advice[1], 0, || nullifier)?,
                    vote: region.assign_advice(|| "vote", advice[2], 0, || vote)?,
                    round_id: region.assign_advice(|| "round_id", advice[3], 0, || round_id)?,
                    zero: region.assign_advice_from_constant(|| "zero", advice[4], 0, Fp::ZERO)?,
                })
            },
        )
    }

    pub fn hash(
        &self,
        mut layouter: impl Layouter<Fp>,
        left: AssignedCell<Fp, Fp>,
        right: AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let chip = Pow5Chip::construct(self.config.poseidon.clone());
        let hasher = Poseidon2::init(chip, layouter.namespace(|| "poseidon_init"))?;
        hasher.hash(layouter.namespace(|| "poseidon_hash"), [left, right])
    }

    /// Order `node` and `sibling` by `direction`, returning `(left, right)`.
    pub fn conditional_swap(
        &self,
        mut layouter: impl Layouter<Fp>,
        node: &AssignedCell<Fp, Fp>,
        sibling: Value<Fp>,
        direction: Value<Fp>,
    ) -> Result<(AssignedCell<Fp, Fp>, AssignedCell<Fp, Fp>), Error> {
        layouter.assign_region(
            || "conditional_swap",
            |mut region| {
                self.config.s_swap.enable(&mut region, 0)?;

                let node = node.copy_advice(|| "node", &mut region, self.config.advice[0], 0)?;
                region.assign_advice(|| "sibling", self.config.advice[1], 0, || sibling)?;
                region.assign_advice(|| "direction", self.config.advice[2], 0, || direction)?;

                let node_value = node.value().copied();
                let left = node_value
                    .zip(sibling)
                    .zip(direction)
                    .map(|((n, s), d)| n + d * (s - n));
                let right = node_value
                    .zip(sibling)
                    .zip(direction)
                    .map(|((n, s), d)| s + d * (n - s));

                let left = region.assign_advice(|| "left", self.config.advice[3], 0, || left)?;
                let right = region.assign_advice(|| "right", self.config.advice[4], 0, || right)?;

                Ok((left, right))
            },
        )
    }

    pub fn expose_public(
        &self,
        mut layouter: impl Layouter<Fp>,
        cell: &AssignedCell<Fp, Fp>,
        row: usize,
    ) -> Result<(), Error> {
        layouter.constrain_instance(cell.cell(), self.config.instance, row)
    }
}

#[derive(Clone, Debug)]
pub struct VouchCircuit {
    pub secret: Value<Fp>,
    pub nullifier: Value<Fp>,
    pub vote: Value<Fp>,
    pub round_id: Value<Fp>,
    pub siblings: Vec<Value<Fp>>,
    pub directions: Vec<Value<Fp>>,
}

impl VouchCircuit {
    /// Circuit shape for a tree of `depth` levels with no witness values,
    /// as used for key generation.
    pub fn blank(depth: usize) -> Self {
        Self {
            secret: Value::unknown(),
            nullifier: Value::unknown(),
            vote: Value::unknown(),
            round_id: Value::unknown(),
            siblings: vec![Value::unknown(); depth],
            directions: vec![Value::unknown(); depth],
        }
    }

    pub fn new(witness: &VouchWitness, round_id: u64) -> Self {
        let siblings = witness.path.siblings().into_iter().map(Value::known).collect();
        let directions = witness
            .path
            .direction_bits()
            .into_iter()
            .map(|bit| Value::known(Fp::from(u64::from(bit))))
            .collect();

        Self {
            secret: Value::known(witness.secret),
            nullifier: Value::known(witness.nullifier),
            vote: Value::known(Fp::from(u64::from(witness.vote))),
            round_id: Value::known(Fp::from(round_id)),
            siblings,
            directions,
        }
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

impl Circuit<Fp> for VouchCircuit {
    type Config = VouchConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::blank(self.depth())
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        let advice = [
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
        ];
        let instance = meta.instance_column();

        VouchChip::configure(meta, advice, instance)
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<Fp>,
    ) -> Result<(), Error> {
        let chip = VouchChip::construct(config);

        let witness = chip.load_witness(
            layouter.namespace(|| "load_witness"),
            self.secret,
            self.nullifier,
            self.vote,
            self.round_id,
        )?;

        // 1. Recompute the commitment
        let inner = chip.hash(
            layouter.namespace(|| "secret_nullifier"),
            witness.secret,
            witness.nullifier.clone(),
        )?;
        let commitment = chip.hash(layouter.namespace(|| "commitment"), inner, witness.vote.clone())?;

        // 2. Nullifier hash
        let nullifier_hash =
            chip.hash(layouter.namespace(|| "nullifier_hash"), witness.nullifier, witness.zero)?;

        // 3. Walk the authentication path
        let mut node = commitment;
        for (level, (sibling, direction)) in self.siblings.iter().zip(&self.directions).enumerate()
        {
            let (left, right) = chip.conditional_swap(
                layouter.namespace(|| format!("swap_{}", level)),
                &node,
                *sibling,
                *direction,
            )?;
            node = chip.hash(layouter.namespace(|| format!("node_{}", level)), left, right)?;
        }

        // Expose public inputs
        chip.expose_public(layouter.namespace(|| "root"), &node, ROOT_ROW)?;
        chip.expose_public(
            layouter.namespace(|| "nullifier_hash"),
            &nullifier_hash,
            NULLIFIER_HASH_ROW,
        )?;
        chip.expose_public(layouter.namespace(|| "vote"), &witness.vote, VOTE_ROW)?;
        chip.expose_public(layouter.namespace(|| "round_id"), &witness.round_id, ROUND_ID_ROW)?;

        Ok(())
    }
}

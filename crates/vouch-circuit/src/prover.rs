//! Native Prover for the membership circuit
//!
//! Off-chain proof generation with the full halo2_proofs library, plus the
//! verifying half the ballot consumes.

use crate::circuit::VouchCircuit;
use crate::keys::KeyManager;
use crate::witness::VouchWitness;
use anyhow::{ensure, Context, Result};
use halo2_proofs::{
    plonk::{create_proof, verify_proof, ProvingKey, SingleVerifier, VerifyingKey},
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use halo2curves::pasta::{EqAffine, Fp};
use rand::rngs::OsRng;
use tracing::{debug, info};
use vouch_runtime::{ProverConfig, PublicInputs, VouchProof};

/// Everything needed to check a membership proof.
///
/// Cheap to share: the ballot keeps one of these and never sees a witness.
#[derive(Clone, Debug)]
pub struct VerifyingMaterial {
    tree_depth: u32,
    params: Params<EqAffine>,
    vk: VerifyingKey<EqAffine>,
}

impl VerifyingMaterial {
    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    /// `true` iff `proof` is valid for `inputs`; malformed bytes are just invalid.
    pub fn verify(&self, proof: &VouchProof, inputs: &PublicInputs) -> bool {
        verify_with(&self.params, &self.vk, proof, inputs)
    }
}

fn verify_with(
    params: &Params<EqAffine>,
    vk: &VerifyingKey<EqAffine>,
    proof: &VouchProof,
    inputs: &PublicInputs,
) -> bool {
    if proof.size() == 0 {
        return false;
    }

    let instance = inputs.to_instance();
    let instances: &[&[Fp]] = &[instance.as_slice()];
    let mut transcript = Blake2bRead::<_, EqAffine, Challenge255<_>>::init(proof.as_bytes());
    let strategy = SingleVerifier::new(params);

    verify_proof(params, vk, strategy, &[instances], &mut transcript).is_ok()
}

pub struct VouchProver {
    tree_depth: u32,
    params: Params<EqAffine>,
    proving_key: ProvingKey<EqAffine>,
    verifying_key: VerifyingKey<EqAffine>,
}

impl VouchProver {
    /// Generate (or load cached params for) the keys of a `tree_depth` circuit.
    pub fn setup(key_manager: &KeyManager, tree_depth: u32, k: Option<u32>) -> Result<Self> {
        let (params, proving_key, verifying_key) = key_manager.generate_keys(tree_depth, k)?;

        Ok(Self { tree_depth, params, proving_key, verifying_key })
    }

    pub fn from_config(config: &ProverConfig) -> Result<Self> {
        let key_manager = KeyManager::new(&config.cache_dir)?;
        Self::setup(&key_manager, config.tree_depth, config.k)
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    pub fn k(&self) -> u32 {
        self.params.k()
    }

    /// Prove membership of the witness's commitment for `round_id`.
    ///
    /// Returns the proof with the public inputs it binds to.
    pub fn prove(&self, witness: &VouchWitness, round_id: u64) -> Result<(VouchProof, PublicInputs)> {
        ensure!(
            witness.path.depth() == self.tree_depth as usize,
            "Merkle path has depth {}, circuit expects {}",
            witness.path.depth(),
            self.tree_depth
        );

        let public_inputs = witness.public_inputs(round_id);
        let circuit = VouchCircuit::new(witness, round_id);

        let instance = public_inputs.to_instance();
        let instances: &[&[Fp]] = &[instance.as_slice()];
        let mut transcript = Blake2bWrite::<_, EqAffine, Challenge255<_>>::init(vec![]);

        debug!(round_id, tree_depth = self.tree_depth, "creating membership proof");
        create_proof(
            &self.params,
            &self.proving_key,
            std::slice::from_ref(&circuit),
            &[instances],
            OsRng,
            &mut transcript,
        )
        .context("Failed to create proof")?;

        let proof = VouchProof::new(transcript.finalize());
        info!(round_id, size = proof.size(), "membership proof created");

        Ok((proof, public_inputs))
    }

    pub fn verify(&self, proof: &VouchProof, inputs: &PublicInputs) -> bool {
        verify_with(&self.params, &self.verifying_key, proof, inputs)
    }

    pub fn verifying_material(&self) -> VerifyingMaterial {
        VerifyingMaterial {
            tree_depth: self.tree_depth,
            params: self.params.clone(),
            vk: self.verifying_key.clone(),
        }
    }

    pub fn proving_key(&self) -> &ProvingKey<EqAffine> {
        &self.proving_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey<EqAffine> {
        &self.verifying_key
    }
}

//! Proof verification capability
//!
//! The ballot only ever asks one question of the proof system, so any
//! verifier (or a closure in tests) can stand behind [`VouchVerifier`].

use vouch_circuit::{VerifyingMaterial, VouchProver};
use vouch_runtime::{PublicInputs, VouchProof};

pub trait VouchVerifier {
    /// Accept or reject `proof` for `inputs`. Must not panic on garbage bytes.
    fn verify(&self, proof: &VouchProof, inputs: &PublicInputs) -> bool;
}

impl<F> VouchVerifier for F
where
    F: Fn(&VouchProof, &PublicInputs) -> bool,
{
    fn verify(&self, proof: &VouchProof, inputs: &PublicInputs) -> bool {
        self(proof, inputs)
    }
}

/// Verifier backed by the membership circuit's verifying key.
#[derive(Clone, Debug)]
pub struct Halo2VouchVerifier {
    material: VerifyingMaterial,
}

impl Halo2VouchVerifier {
    pub fn new(material: VerifyingMaterial) -> Self {
        Self { material }
    }

    pub fn from_prover(prover: &VouchProver) -> Self {
        Self::new(prover.verifying_material())
    }

    pub fn tree_depth(&self) -> u32 {
        self.material.tree_depth()
    }
}

impl VouchVerifier for Halo2VouchVerifier {
    fn verify(&self, proof: &VouchProof, inputs: &PublicInputs) -> bool {
        self.material.verify(proof, inputs)
    }
}

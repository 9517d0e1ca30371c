//! Proving and Verification Key Management
//!
//! IPA parameters are cached on disk per circuit size. halo2_proofs 0.3 has no
//! stable key serialization, so keys are regenerated from the cached params
//! and the blank circuit for the requested tree depth.

use anyhow::{Context, Result};
use halo2_proofs::{
    plonk::{keygen_pk, keygen_vk, ProvingKey, VerifyingKey},
    poly::commitment::Params,
};
use halo2curves::pasta::EqAffine;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use vouch_runtime::PublicInputs;

use crate::circuit::{k_for_depth, VouchCircuit};

pub const CIRCUIT_NAME: &str = "vouch_membership";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyMetadata {
    pub circuit_name: String,
    pub k: u32,
    pub tree_depth: u32,
    pub num_public_inputs: usize,
}

impl KeyMetadata {
    pub fn for_depth(tree_depth: u32, k: u32) -> Self {
        Self {
            circuit_name: CIRCUIT_NAME.to_string(),
            k,
            tree_depth,
            num_public_inputs: PublicInputs::LEN,
        }
    }
}

pub struct KeyManager {
    cache_dir: PathBuf,
}

impl KeyManager {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).context("Failed to create key cache directory")?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn params_path(&self, k: u32) -> PathBuf {
        self.cache_dir.join(format!("params_k{}.bin", k))
    }

    pub fn metadata_path(&self, tree_depth: u32, k: u32) -> PathBuf {
        self.cache_dir.join(format!("{}_d{}_k{}_metadata.json", CIRCUIT_NAME, tree_depth, k))
    }

    /// Load cached params for `k`, generating and caching them on a miss.
    pub fn generate_params(&self, k: u32) -> Result<Params<EqAffine>> {
        let params_path = self.params_path(k);

        if params_path.exists() {
            debug!(k, path = ?params_path, "loading cached IPA parameters");
            return self.load_params(k);
        }

        info!(k, "generating IPA parameters");
        let params = Params::<EqAffine>::new(k);

        self.save_params(&params, k)?;

        Ok(params)
    }

    fn save_params(&self, params: &Params<EqAffine>, k: u32) -> Result<()> {
        let path = self.params_path(k);
        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create params file at {:?}", path))?;

        params.write(&mut file).context("Failed to write params")?;

        debug!(path = ?path, "saved IPA parameters");
        Ok(())
    }

    pub fn load_params(&self, k: u32) -> Result<Params<EqAffine>> {
        let path = self.params_path(k);
        let mut file = fs::File::open(&path)
            .with_context(|| format!("Failed to open params file at {:?}", path))?;

        Params::<EqAffine>::read(&mut file).context("Failed to deserialize params")
    }

    /// Generate keys for the membership circuit of a `tree_depth`-level tree.
    ///
    /// `k` defaults to the smallest size that fits the depth.
    pub fn generate_keys(
        &self,
        tree_depth: u32,
        k: Option<u32>,
    ) -> Result<(Params<EqAffine>, ProvingKey<EqAffine>, VerifyingKey<EqAffine>)> {
        let k = k.unwrap_or_else(|| k_for_depth(tree_depth as usize));
        let params = self.generate_params(k)?;
        let circuit = VouchCircuit::blank(tree_depth as usize);

        info!(tree_depth, k, "generating proving and verification keys");

        let vk = keygen_vk(&params, &circuit).context("Failed to generate verification key")?;
        let pk =
            keygen_pk(&params, vk.clone(), &circuit).context("Failed to generate proving key")?;

        self.save_metadata(&KeyMetadata::for_depth(tree_depth, k))?;

        Ok((params, pk, vk))
    }

    fn save_metadata(&self, metadata: &KeyMetadata) -> Result<()> {
        let meta_path = self.metadata_path(metadata.tree_depth, metadata.k);

        let metadata_json =
            serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
        fs::write(&meta_path, metadata_json).context("Failed to write metadata file")?;

        debug!(path = ?meta_path, "saved key metadata");

        Ok(())
    }

    pub fn load_metadata(&self, tree_depth: u32, k: u32) -> Result<KeyMetadata> {
        let meta_path = self.metadata_path(tree_depth, k);
        let content = fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read metadata file at {:?}", meta_path))?;

        serde_json::from_str(&content).context("Failed to deserialize metadata")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_manager_paths() {
        let temp_dir = TempDir::new().unwrap();
        let manager = KeyManager::new(temp_dir.path()).unwrap();

        assert_eq!(manager.params_path(10), temp_dir.path().join("params_k10.bin"));
        assert_eq!(
            manager.metadata_path(20, 11),
            temp_dir.path().join("vouch_membership_d20_k11_metadata.json")
        );
    }

    #[test]
    fn test_params_generation_and_caching() {
        let temp_dir = TempDir::new().unwrap();
        let manager = KeyManager::new(temp_dir.path()).unwrap();

        let params = manager.generate_params(4).unwrap();
        assert_eq!(params.k(), 4);
        assert!(manager.params_path(4).exists());

        let loaded = manager.load_params(4).unwrap();
        assert_eq!(loaded.k(), 4);
    }

    #[test]
    fn test_load_nonexistent_params() {
        let temp_dir = TempDir::new().unwrap();
        let manager = KeyManager::new(temp_dir.path()).unwrap();

        assert!(manager.load_params(20).is_err());
    }

    #[test]
    fn test_generate_keys_writes_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let manager = KeyManager::new(temp_dir.path()).unwrap();

        let (params, _pk, _vk) = manager.generate_keys(2, None).unwrap();
        let k = k_for_depth(2);
        assert_eq!(params.k(), k);

        let metadata = manager.load_metadata(2, k).unwrap();
        assert_eq!(metadata, KeyMetadata::for_depth(2, k));
        assert_eq!(metadata.num_public_inputs, 4);
    }

    #[test]
    fn test_load_nonexistent_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let manager = KeyManager::new(temp_dir.path()).unwrap();

        assert!(manager.load_metadata(20, 11).is_err());
    }

    #[test]
    fn test_key_manager_cache_dir_creation() {
        let temp_dir = TempDir::new().unwrap();
        let cache_path = temp_dir.path().join("nested").join("cache");

        let manager = KeyManager::new(&cache_path).unwrap();
        assert!(cache_path.exists());
        assert_eq!(manager.cache_dir(), cache_path.as_path());
    }
}

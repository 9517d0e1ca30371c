//! Deployment configuration
//!
//! Fixed at system construction and immutable afterwards: the ballot and the
//! off-chain mirror read the same tree depth from here.

use crate::error::{Result, VouchError};
use crate::merkle::{DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH, MIN_TREE_DEPTH};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn default_tree_depth() -> u32 {
    DEFAULT_TREE_DEPTH
}

fn default_candidate_count() -> usize {
    2
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".vouch_cache")
}

/// Ballot deployment parameters.
///
/// # Examples
///
/// ```
/// use vouch_runtime::BallotConfig;
///
/// let json = r#"{
///     "admin": "0x0000000000000000000000000000000000000001",
///     "vouchers": ["0x0000000000000000000000000000000000000002"]
/// }"#;
/// let config = BallotConfig::from_json_str(json).unwrap();
/// assert_eq!(config.tree_depth, 20);
/// assert_eq!(config.candidate_count, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BallotConfig {
    #[serde(default = "default_tree_depth")]
    pub tree_depth: u32,
    /// Exact number of candidates every round must carry
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,
    /// Round administrator
    pub admin: Address,
    /// Identities allowed to register a commitment
    pub vouchers: Vec<Address>,
}

impl BallotConfig {
    pub fn new(admin: Address, vouchers: Vec<Address>) -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            candidate_count: default_candidate_count(),
            admin,
            vouchers,
        }
    }

    pub fn with_tree_depth(mut self, tree_depth: u32) -> Self {
        self.tree_depth = tree_depth;
        self
    }

    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = candidate_count;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validate_tree_depth(self.tree_depth)?;

        if self.candidate_count < 2 {
            return Err(VouchError::invalid_config(format!(
                "candidate_count must be at least 2, got {}",
                self.candidate_count
            )));
        }

        if self.vouchers.is_empty() {
            return Err(VouchError::invalid_config("voucher registry is empty"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.vouchers.iter().find(|v| !seen.insert(**v)) {
            return Err(VouchError::invalid_config(format!("duplicate voucher {}", dup)));
        }

        Ok(())
    }
}

/// Off-chain prover parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProverConfig {
    #[serde(default = "default_tree_depth")]
    pub tree_depth: u32,
    /// Circuit size override (2^k rows); derived from the depth when absent
    #[serde(default)]
    pub k: Option<u32>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl ProverConfig {
    pub fn new(tree_depth: u32) -> Self {
        Self { tree_depth, k: None, cache_dir: default_cache_dir() }
    }

    pub fn with_cache_dir<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = cache_dir.as_ref().to_path_buf();
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        validate_tree_depth(config.tree_depth)?;
        Ok(config)
    }
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_DEPTH)
    }
}

fn validate_tree_depth(depth: u32) -> Result<()> {
    if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
        return Err(VouchError::InvalidTreeDepth(depth));
    }
    Ok(())
}

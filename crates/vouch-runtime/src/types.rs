//! Core types for the Vouch ballot
//!
//! Field-element newtypes for the values that cross the boundary between the
//! ballot, the off-chain mirror and the membership circuit, plus the identity
//! and stage types the ballot state machine is expressed in.

use crate::error::{Result, VouchError};
use ff::PrimeField;
use halo2curves::pasta::Fp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Encode a field element as little-endian hex of its canonical representation.
pub fn field_to_hex(f: &Fp) -> String {
    format!("0x{}", hex::encode(f.to_repr()))
}

/// Decode a field element written by [`field_to_hex`].
pub fn field_from_hex(s: &str) -> Result<Fp> {
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex_str)
        .map_err(|e| VouchError::serialization_error(format!("invalid hex: {}", e)))?;

    let mut repr = <Fp as PrimeField>::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(VouchError::serialization_error(format!(
            "field element must be {} bytes, got {}",
            repr.as_ref().len(),
            bytes.len()
        )));
    }
    repr.as_mut().copy_from_slice(&bytes);

    Option::from(Fp::from_repr(repr))
        .ok_or_else(|| VouchError::serialization_error("non-canonical field element"))
}

/// serde adapter for bare `Fp` fields.
pub mod field_serde {
    use super::*;

    pub fn serialize<S: Serializer>(f: &Fp, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_hex(f))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Fp, D::Error> {
        let s = String::deserialize(deserializer)?;
        field_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! field_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "field_serde")] Fp);

        impl $name {
            pub fn new(value: Fp) -> Self {
                Self(value)
            }

            pub fn inner(&self) -> Fp {
                self.0
            }

            pub fn to_hex(&self) -> String {
                field_to_hex(&self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self> {
                field_from_hex(s).map(Self)
            }
        }

        impl From<Fp> for $name {
            fn from(value: Fp) -> Self {
                Self(value)
            }
        }

        // Canonical repr bytes, consistent with `Eq`
        impl Hash for $name {
            fn hash<S: Hasher>(&self, state: &mut S) {
                self.0.to_repr().as_ref().hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

field_newtype!(
    /// A tree leaf: `H(H(secret, nullifier), vote)`.
    ///
    /// Hides the vote until reveal; never mutated once inserted.
    Commitment
);

field_newtype!(
    /// Public one-time token `H(nullifier, 0)` disclosed at reveal.
    NullifierHash
);

field_newtype!(
    /// Digest summarizing every commitment inserted up to some point.
    MerkleRoot
);

/// A 20-byte account identity (admin, voucher or candidate).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose trailing eight bytes hold `n` big-endian.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str)
            .map_err(|e| VouchError::serialization_error(format!("invalid address: {}", e)))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|b: Vec<u8>| {
            VouchError::serialization_error(format!("address must be 20 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Phase of the ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Registration,
    Tally,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::Registration => "Registration",
            Stage::Tally => "Tally",
        };
        f.write_str(name)
    }
}

/// Serialized membership proof as produced by the off-chain prover.
///
/// The ballot treats the bytes as opaque and only hands them to its verifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VouchProof {
    proof_data: Vec<u8>,
}

impl VouchProof {
    pub fn new(proof_data: Vec<u8>) -> Self {
        Self { proof_data }
    }

    pub fn size(&self) -> usize {
        self.proof_data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.proof_data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.proof_data
    }
}

/// Public inputs of a reveal proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub root: MerkleRoot,
    pub nullifier_hash: NullifierHash,
    pub vote: u32,
    pub round_id: u64,
}

impl PublicInputs {
    /// Number of rows the circuit's instance column occupies.
    pub const LEN: usize = 4;

    /// Instance column layout: `[root, nullifier_hash, vote, round_id]`.
    pub fn to_instance(&self) -> Vec<Fp> {
        vec![
            self.root.inner(),
            self.nullifier_hash.inner(),
            Fp::from(u64::from(self.vote)),
            Fp::from(self.round_id),
        ]
    }
}

//! Revocation accumulator over issued credential indices.
//!
//! The accumulator value is the Merkle root of the sorted issued-index
//! leaves. A witness is the inclusion path of one index; a membership proof
//! presents that path bound to a verifier-chosen context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::CryptoError;
use crate::hashing::{self, Hash, MerkleStep};

const LEAF_DOMAIN: &[u8] = b"tessera:rev-idx";

/// Public accumulator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator(#[serde(with = "crate::encoding::hex32")] pub Hash);

impl Accumulator {
    /// Accumulate the given issued indices.
    pub fn from_indices(issued: &BTreeSet<u32>) -> Self {
        let leaves: Vec<Hash> = issued.iter().map(|idx| Self::leaf(*idx)).collect();
        Self(hashing::merkle_root(&leaves))
    }

    /// Leaf hash for one revocation index.
    pub fn leaf(index: u32) -> Hash {
        hashing::hash_parts(&[LEAF_DOMAIN, &index.to_le_bytes()])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Inclusion witness for one index against one accumulator value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub index: u32,
    pub path: Vec<MerkleStep>,
}

impl Witness {
    /// Build the witness for `index`, failing with `NotAMember` when the index
    /// is not in the issued set.
    pub fn create(issued: &BTreeSet<u32>, index: u32) -> Result<Self, CryptoError> {
        let position = issued
            .iter()
            .position(|idx| *idx == index)
            .ok_or(CryptoError::NotAMember(index))?;
        let leaves: Vec<Hash> = issued.iter().map(|idx| Accumulator::leaf(*idx)).collect();
        let path = hashing::merkle_path(&leaves, position).ok_or(CryptoError::NotAMember(index))?;
        Ok(Self { index, path })
    }

    /// Whether the witness opens to the given accumulator.
    pub fn is_valid_for(&self, accumulator: &Accumulator) -> bool {
        hashing::verify_merkle_path(&Accumulator::leaf(self.index), &self.path, &accumulator.0)
    }
}

/// Non-revocation proof presented to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Accumulator value the witness was built against.
    pub accumulator: Accumulator,
    pub index: u32,
    pub path: Vec<MerkleStep>,
    /// Binds the proof to the verifier context (request nonce).
    #[serde(with = "crate::encoding::hex32")]
    pub binding: Hash,
}

fn binding_for(accumulator: &Accumulator, index: u32, context: &[u8]) -> Hash {
    hashing::hash_parts(&[&accumulator.0, &index.to_le_bytes(), context])
}

impl MembershipProof {
    /// Prove membership of the witness index, failing when the witness does not
    /// open to `accumulator`.
    pub fn prove(
        witness: &Witness,
        accumulator: &Accumulator,
        context: &[u8],
    ) -> Result<Self, CryptoError> {
        if !witness.is_valid_for(accumulator) {
            tracing::debug!(index = witness.index, "witness does not open to accumulator");
            return Err(CryptoError::NotAMember(witness.index));
        }
        Ok(Self {
            accumulator: *accumulator,
            index: witness.index,
            path: witness.path.clone(),
            binding: binding_for(accumulator, witness.index, context),
        })
    }

    /// Verify against the published accumulator value.
    pub fn verify(&self, accumulator: &Accumulator, context: &[u8]) -> bool {
        self.accumulator == *accumulator
            && self.binding == binding_for(accumulator, self.index, context)
            && hashing::verify_merkle_path(&Accumulator::leaf(self.index), &self.path, &accumulator.0)
    }
}

use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::hashing::{self, Hash};
use crate::pedersen::random_scalar;

/// Random blinding factor hiding a committed value.
///
/// A canonical Ristretto scalar, so the same blinding serves both hash
/// commitments and Pedersen attribute commitments.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct Blinding(#[serde(with = "crate::encoding::scalar")] Scalar);

impl Blinding {
    /// Fresh blinding from the thread-local RNG.
    pub fn random() -> Self {
        Self(random_scalar())
    }

    /// Blinding from arbitrary bytes, reduced modulo the group order.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Scalar::from_bytes_mod_order(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub(crate) fn scalar(&self) -> Scalar {
        self.0
    }
}

impl fmt::Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blinding(..)")
    }
}

/// A BLAKE3-based commitment: H(value || blinding).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment {
    #[serde(with = "crate::encoding::hex32")]
    pub hash: Hash,
}

impl Commitment {
    /// Commit to a value with a fresh blinding.
    pub fn commit(value: &[u8]) -> (Self, Blinding) {
        let blinding = Blinding::random();
        (Self::commit_with_blinding(value, &blinding), blinding)
    }

    /// Commit to a value with a caller-supplied blinding.
    pub fn commit_with_blinding(value: &[u8], blinding: &Blinding) -> Self {
        Self {
            hash: hashing::create_commitment(value, blinding.as_bytes()),
        }
    }

    /// Check that a value and blinding open this commitment.
    pub fn verify(&self, value: &[u8], blinding: &Blinding) -> bool {
        hashing::verify_commitment(value, blinding.as_bytes(), &self.hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

//! Pedersen commitments over Ristretto for credential attributes.
//!
//! `C = m·G + r·H`, where `m` is the attribute's encoded value as a scalar and
//! `H` is a second generator with no known discrete log relative to `G`.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::Scalar;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::commitment::Blinding;
use crate::error::CryptoError;

const BLINDING_GENERATOR_LABEL: &[u8] = b"tessera:pedersen:blinding-generator";

pub(crate) fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

pub(crate) fn value_generator() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Nothing-up-my-sleeve generator hashed onto the curve.
pub(crate) fn blinding_generator() -> RistrettoPoint {
    static GENERATOR: OnceLock<RistrettoPoint> = OnceLock::new();
    *GENERATOR.get_or_init(|| {
        let mut uniform = [0u8; 64];
        let mut hasher = blake3::Hasher::new();
        hasher.update(BLINDING_GENERATOR_LABEL);
        hasher.finalize_xof().fill(&mut uniform);
        RistrettoPoint::from_uniform_bytes(&uniform)
    })
}

pub(crate) fn commit(value: Scalar, blinding: Scalar) -> RistrettoPoint {
    value_generator() * value + blinding_generator() * blinding
}

/// Signed integer as a scalar; negatives map to `ℓ - |x|`.
pub(crate) fn signed_scalar(x: i128) -> Scalar {
    let magnitude = Scalar::from(x.unsigned_abs());
    if x < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Scalar for an encoded attribute value: a decimal that is either a signed
/// 32-bit integer or an unsigned 128-bit hash.
fn encoded_scalar(encoded: &str) -> Result<Scalar, CryptoError> {
    if let Ok(value) = encoded.parse::<u128>() {
        return Ok(Scalar::from(value));
    }
    encoded
        .parse::<i128>()
        .map(signed_scalar)
        .map_err(|_| CryptoError::InvalidInput(format!("encoded value {} is not decimal", encoded)))
}

/// Commitment to one encoded credential attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCommitment(#[serde(with = "crate::encoding::point")] CompressedRistretto);

impl AttributeCommitment {
    pub fn for_attribute(encoded: &str, blinding: &Blinding) -> Result<Self, CryptoError> {
        let value = encoded_scalar(encoded)?;
        Ok(Self(commit(value, blinding.scalar()).compress()))
    }

    /// Check that an encoded value and blinding open this commitment.
    pub fn opens(&self, encoded: &str, blinding: &Blinding) -> bool {
        match Self::for_attribute(encoded, blinding) {
            Ok(expected) => expected == *self,
            Err(_) => false,
        }
    }

    /// The committed point, or `None` when the bytes are not a valid encoding.
    pub(crate) fn point(&self) -> Option<RistrettoPoint> {
        self.0.decompress()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

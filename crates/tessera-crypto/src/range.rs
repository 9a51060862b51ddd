//! Range proofs by bit decomposition.
//!
//! Proves that a Pedersen commitment `C` opens to some `v` in `[0, 2^64)`.
//! The prover commits to each bit `b_i` of `v` as `C_i = b_i·G + r_i·H`,
//! choosing the `r_i` so that `Σ 2^i·C_i = C`, and shows with a
//! disjunctive Schnorr proof that each `C_i` commits to 0 or 1.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};

use crate::pedersen::{blinding_generator, commit, random_scalar, value_generator};
use crate::transcript::Transcript;

pub const RANGE_BITS: usize = 64;

const BIT_LABEL: &[u8] = b"tessera:range:bit";

fn power_of_two(i: usize) -> Scalar {
    Scalar::from(1u64 << i)
}

/// Proof that one bit commitment opens to 0 or 1.
///
/// Branch 0 proves knowledge of `r` with `C_i = r·H`, branch 1 with
/// `C_i - G = r·H`. One branch is simulated; the verifier only learns that the
/// two challenges sum to the transcript challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitProof {
    #[serde(with = "crate::encoding::point")]
    pub commitment: CompressedRistretto,
    #[serde(with = "crate::encoding::scalar")]
    pub c0: Scalar,
    #[serde(with = "crate::encoding::scalar")]
    pub c1: Scalar,
    #[serde(with = "crate::encoding::scalar")]
    pub z0: Scalar,
    #[serde(with = "crate::encoding::scalar")]
    pub z1: Scalar,
}

fn bit_challenge(
    context: &[u8],
    target: &CompressedRistretto,
    index: usize,
    commitment: &CompressedRistretto,
    a0: &RistrettoPoint,
    a1: &RistrettoPoint,
) -> Scalar {
    let mut transcript = Transcript::new(BIT_LABEL);
    transcript.append(context);
    transcript.append_point(target);
    transcript.append_u64(index as u64);
    transcript.append_point(commitment);
    transcript.append_point(&a0.compress());
    transcript.append_point(&a1.compress());
    transcript.challenge()
}

impl BitProof {
    fn prove(
        bit: bool,
        blinding: Scalar,
        context: &[u8],
        target: &CompressedRistretto,
        index: usize,
    ) -> Self {
        let g = value_generator();
        let h = blinding_generator();
        let point = if bit { g + h * blinding } else { h * blinding };
        let commitment = point.compress();
        let statements = [point, point - g];

        let nonce = random_scalar();
        let simulated_challenge = random_scalar();
        let simulated_response = random_scalar();
        let real = usize::from(bit);
        let fake = 1 - real;

        let mut announcements = [RistrettoPoint::default(); 2];
        announcements[real] = h * nonce;
        announcements[fake] = h * simulated_response - statements[fake] * simulated_challenge;

        let challenge = bit_challenge(
            context,
            target,
            index,
            &commitment,
            &announcements[0],
            &announcements[1],
        );
        let real_challenge = challenge - simulated_challenge;
        let real_response = nonce + real_challenge * blinding;

        let (c0, c1, z0, z1) = if bit {
            (simulated_challenge, real_challenge, simulated_response, real_response)
        } else {
            (real_challenge, simulated_challenge, real_response, simulated_response)
        };
        Self {
            commitment,
            c0,
            c1,
            z0,
            z1,
        }
    }

    fn verify(
        &self,
        point: &RistrettoPoint,
        context: &[u8],
        target: &CompressedRistretto,
        index: usize,
    ) -> bool {
        let h = blinding_generator();
        let a0 = h * self.z0 - point * self.c0;
        let a1 = h * self.z1 - (point - value_generator()) * self.c1;
        self.c0 + self.c1 == bit_challenge(context, target, index, &self.commitment, &a0, &a1)
    }
}

/// Proof that a commitment opens to a value in `[0, 2^64)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    pub bits: Vec<BitProof>,
}

impl RangeProof {
    /// Prove the range for `commit(value, blinding)`. `context` binds the
    /// proof to the statement it is part of.
    pub(crate) fn prove(value: u64, blinding: Scalar, context: &[u8]) -> Self {
        let target = commit(Scalar::from(value), blinding).compress();

        let mut bit_blindings: Vec<Scalar> = (0..RANGE_BITS - 1).map(|_| random_scalar()).collect();
        let weighted: Scalar = bit_blindings
            .iter()
            .enumerate()
            .map(|(i, r)| power_of_two(i) * r)
            .sum();
        bit_blindings.push((blinding - weighted) * power_of_two(RANGE_BITS - 1).invert());

        let bits = bit_blindings
            .into_iter()
            .enumerate()
            .map(|(i, r)| BitProof::prove((value >> i) & 1 == 1, r, context, &target, i))
            .collect();
        Self { bits }
    }

    /// Verify against the commitment the verifier derived itself.
    pub(crate) fn verify(&self, target: &RistrettoPoint, context: &[u8]) -> bool {
        if self.bits.len() != RANGE_BITS {
            return false;
        }
        let Some(points) = self
            .bits
            .iter()
            .map(|bit| bit.commitment.decompress())
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };

        let recombined: RistrettoPoint = points
            .iter()
            .enumerate()
            .map(|(i, point)| point * power_of_two(i))
            .sum();
        if recombined != *target {
            return false;
        }

        let target = target.compress();
        self.bits
            .iter()
            .zip(&points)
            .enumerate()
            .all(|(i, (bit, point))| bit.verify(point, context, &target, i))
    }
}

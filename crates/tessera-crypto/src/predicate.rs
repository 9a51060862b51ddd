use curve25519_dalek::ristretto::RistrettoPoint;
use serde::{Deserialize, Serialize};

use tessera_core::{normalize_attr_name, PredicateType};

use crate::commitment::Blinding;
use crate::error::CryptoError;
use crate::hashing;
use crate::pedersen::{signed_scalar, value_generator, AttributeCommitment};
use crate::range::RangeProof;

const PREDICATE_DOMAIN: &[u8] = b"tessera:predicate";

/// Proof that a committed attribute satisfies `value <op> threshold`
/// without disclosing the value.
///
/// Both sides derive the commitment to the slack from the issuer-signed
/// attribute commitment `C` and the public threshold `t`:
///
/// | op   | slack          | slack commitment |
/// |------|----------------|------------------|
/// | `>=` | `v - t`        | `C - t·G`        |
/// | `>`  | `v - t - 1`    | `C - (t+1)·G`    |
/// | `<=` | `t - v`        | `t·G - C`        |
/// | `<`  | `t - v - 1`    | `(t-1)·G - C`    |
///
/// The range proof shows the slack is in `[0, 2^64)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateProof {
    /// Attribute the predicate is over.
    pub attr_name: String,
    /// Comparison operator (public).
    pub p_type: PredicateType,
    /// Threshold (public).
    pub p_value: i64,
    pub range: RangeProof,
}

/// Slack that must be non-negative for the predicate to hold.
fn slack(p_type: PredicateType, value: i64, threshold: i64) -> i128 {
    let (value, threshold) = (i128::from(value), i128::from(threshold));
    match p_type {
        PredicateType::GE => value - threshold,
        PredicateType::GT => value - threshold - 1,
        PredicateType::LE => threshold - value,
        PredicateType::LT => threshold - value - 1,
    }
}

/// Whether the slack commitment is `C` shifted (`>=`, `>`) or its negation
/// shifted (`<=`, `<`), and by how much.
fn orientation(p_type: PredicateType, threshold: i64) -> (bool, i128) {
    let threshold = i128::from(threshold);
    match p_type {
        PredicateType::GE => (true, threshold),
        PredicateType::GT => (true, threshold + 1),
        PredicateType::LE => (false, threshold),
        PredicateType::LT => (false, threshold - 1),
    }
}

fn slack_commitment(
    commitment: &RistrettoPoint,
    p_type: PredicateType,
    threshold: i64,
) -> RistrettoPoint {
    let (ascending, shift) = orientation(p_type, threshold);
    let shift = value_generator() * signed_scalar(shift);
    if ascending {
        commitment - shift
    } else {
        shift - commitment
    }
}

fn context_for(
    attr_name: &str,
    p_type: PredicateType,
    p_value: i64,
    nonce: &[u8],
) -> hashing::Hash {
    hashing::hash_parts(&[
        PREDICATE_DOMAIN,
        normalize_attr_name(attr_name).as_bytes(),
        p_type.symbol().as_bytes(),
        &p_value.to_le_bytes(),
        nonce,
    ])
}

impl PredicateProof {
    /// Prove `value <p_type> p_value` for the attribute committed with `blinding`.
    ///
    /// `context` is the proof request nonce; the proof does not transfer to
    /// another request.
    pub fn prove(
        attr_name: &str,
        encoded: &str,
        blinding: &Blinding,
        p_type: PredicateType,
        p_value: i64,
        context: &[u8],
    ) -> Result<Self, CryptoError> {
        let value: i64 = encoded.parse().map_err(|_| {
            CryptoError::InvalidInput(format!("attribute {} is not numeric", attr_name))
        })?;

        let slack = u64::try_from(slack(p_type, value, p_value)).map_err(|_| {
            CryptoError::PredicateUnsatisfied(format!("{} {} {}", attr_name, p_type, p_value))
        })?;
        let (ascending, _) = orientation(p_type, p_value);
        let slack_blinding = if ascending {
            blinding.scalar()
        } else {
            -blinding.scalar()
        };

        let range = RangeProof::prove(
            slack,
            slack_blinding,
            &context_for(attr_name, p_type, p_value, context),
        );
        Ok(Self {
            attr_name: attr_name.to_string(),
            p_type,
            p_value,
            range,
        })
    }

    /// Verify against the issuer-signed commitment for the attribute.
    pub fn verify(&self, expected_commitment: &AttributeCommitment, context: &[u8]) -> bool {
        let Some(commitment) = expected_commitment.point() else {
            return false;
        };
        let target = slack_commitment(&commitment, self.p_type, self.p_value);
        self.range.verify(
            &target,
            &context_for(&self.attr_name, self.p_type, self.p_value, context),
        )
    }
}

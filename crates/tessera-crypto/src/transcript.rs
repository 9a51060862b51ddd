//! Fiat-Shamir transcripts over BLAKE3.

use curve25519_dalek::ristretto::CompressedRistretto;
use curve25519_dalek::Scalar;

const PROTOCOL_LABEL: &[u8] = b"tessera:ristretto:v1";

/// Accumulates public protocol messages and derives challenge scalars.
///
/// Every message is length-prefixed, so distinct message sequences never hash
/// to the same state.
pub(crate) struct Transcript {
    hasher: blake3::Hasher,
}

impl Transcript {
    pub(crate) fn new(label: &[u8]) -> Self {
        let mut transcript = Self {
            hasher: blake3::Hasher::new(),
        };
        transcript.append(PROTOCOL_LABEL);
        transcript.append(label);
        transcript
    }

    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    pub(crate) fn append_point(&mut self, point: &CompressedRistretto) {
        self.append(point.as_bytes());
    }

    pub(crate) fn append_u64(&mut self, value: u64) {
        self.append(&value.to_le_bytes());
    }

    /// Challenge scalar: 64 bytes of XOF output reduced modulo the group order.
    pub(crate) fn challenge(self) -> Scalar {
        let mut wide = [0u8; 64];
        self.hasher.finalize_xof().fill(&mut wide);
        Scalar::from_bytes_mod_order_wide(&wide)
    }
}

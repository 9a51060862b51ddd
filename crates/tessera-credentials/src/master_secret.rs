use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use tessera_crypto::{hash_parts, Blinding, Commitment};

const LINK_DOMAIN: &[u8] = b"tessera:link-secret";

/// Holder secret linking all of a prover's credentials. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    value: [u8; 32],
}

impl MasterSecret {
    pub fn generate() -> Self {
        let mut value = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut value);
        Self { value }
    }

    pub fn from_bytes(value: [u8; 32]) -> Self {
        Self { value }
    }

    /// Hiding commitment the issuer embeds in every credential it issues to
    /// this holder.
    pub fn commitment(&self) -> Commitment {
        let blinding = Blinding::from_bytes(hash_parts(&[LINK_DOMAIN, &self.value]));
        Commitment::commit_with_blinding(LINK_DOMAIN, &blinding)
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterSecret(..)")
    }
}

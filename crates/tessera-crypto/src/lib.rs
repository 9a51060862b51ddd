//! Tessera Crypto: the cryptographic provider behind credential issuance,
//! proof construction and verification.
//!
//! Attribute values are hidden in Pedersen commitments over Ristretto and
//! predicates are proved with bit-decomposition range proofs on those
//! commitments. The issuer signs the commitments with Ed25519.
//!
//! # Linkability
//!
//! Presentations hide unrevealed values but are not unlinkable. Every proof
//! derived from one credential carries the same issuer signature, attribute
//! commitments, link commitment and revocation index, so a verifier (or
//! colluding verifiers) can tell that two presentations came from the same
//! credential. Callers needing unlinkable presentations must use a
//! re-randomizable signature scheme instead.

pub mod accumulator;
pub mod commitment;
pub mod encoding;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod pedersen;
pub mod predicate;
pub mod range;
pub mod signing;
mod transcript;

pub use accumulator::{Accumulator, MembershipProof, Witness};
pub use commitment::{Blinding, Commitment};
pub use error::CryptoError;
pub use hashing::{create_commitment, hash, hash_parts, merkle_root, verify_commitment, Hash};
pub use keys::{KeyPair, PublicKey};
pub use pedersen::AttributeCommitment;
pub use predicate::PredicateProof;
pub use range::{BitProof, RangeProof};
pub use signing::{sign, verify, Signature};

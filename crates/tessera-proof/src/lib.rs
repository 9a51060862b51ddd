//! Tessera Proof: proof requests, candidate matching, proof construction and
//! verification for anonymous credentials.
//!
//! The flow mirrors a holder answering a verifier:
//! - [`resolve_candidates`] lists stored credentials able to satisfy each referent
//! - [`RequestedCredentials`] records the holder's choice
//! - [`build_proof`] turns the choice into a [`Proof`]
//! - [`verify_proof`] checks it against public parameters only

pub mod builder;
pub mod error;
pub mod matcher;
pub mod proof;
pub mod request;
pub mod selection;
pub mod service;
pub mod verifier;

#[cfg(test)]
mod testutil;

pub use builder::{build_proof, ProofBuilder, ProverInputs};
pub use error::ProofError;
pub use matcher::{resolve_candidates, CredentialsForProofRequest, RequestedCredential};
pub use proof::Proof;
pub use request::{generate_nonce, AttributeInfo, Filter, PredicateInfo, ProofRequest, Restrictions};
pub use selection::{RequestedAttribute, RequestedCredentials, RequestedPredicate};
pub use service::ProverService;
pub use verifier::verify_proof;

//! The proof object handed from prover to verifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tessera_core::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use tessera_credentials::SignedFields;
use tessera_crypto::{
    AttributeCommitment, Blinding, Commitment, Hash, MembershipProof, PredicateProof, Signature,
};

use crate::error::ProofError;

/// Opening of a revealed attribute's commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedOpening {
    pub encoded: String,
    pub blinding: Blinding,
}

/// Proof of possession of one issuer-signed credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryProof {
    /// Every attribute commitment the issuer signed, by normalized name.
    pub commitments: BTreeMap<String, AttributeCommitment>,
    /// Openings for revealed attributes, by normalized name.
    pub revealed: BTreeMap<String, RevealedOpening>,
    #[serde(default)]
    pub cred_rev_id: Option<u32>,
    pub link_commitment: Commitment,
    pub signature: Signature,
    pub predicates: Vec<PredicateProof>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubProof {
    pub primary: PrimaryProof,
    #[serde(default)]
    pub non_revoc: Option<MembershipProof>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedProof {
    #[serde(with = "tessera_crypto::encoding::hex32")]
    pub c_hash: Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofData {
    pub proofs: Vec<SubProof>,
    pub aggregated_proof: AggregatedProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttribute {
    pub sub_proof_index: usize,
    pub raw: String,
    pub encoded: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReference {
    pub sub_proof_index: usize,
}

/// Referent-level view of what the proof shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttribute>,
    #[serde(default)]
    pub unrevealed_attrs: BTreeMap<String, SubProofReference>,
    #[serde(default)]
    pub self_attested_attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub predicates: BTreeMap<String, SubProofReference>,
}

/// Public identifiers of the credential behind one sub-proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(default)]
    pub rev_reg_id: Option<RevocationRegistryId>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    pub proof: ProofData,
    pub requested_proof: RequestedProof,
    pub identifiers: Vec<Identifier>,
}

impl Proof {
    pub fn from_json(json: &str) -> Result<Self, ProofError> {
        serde_json::from_str(json)
            .map_err(|e| ProofError::InvalidStructure(format!("malformed proof: {}", e)))
    }
}

impl SubProof {
    /// Fields the issuer signed, rebuilt from the sub-proof and its identifier.
    pub fn signed_fields(&self, identifier: &Identifier) -> SignedFields {
        SignedFields {
            schema_id: identifier.schema_id.clone(),
            cred_def_id: identifier.cred_def_id.clone(),
            rev_reg_id: identifier.rev_reg_id.clone(),
            cred_rev_id: self.primary.cred_rev_id,
            commitments: self.primary.commitments.clone(),
            link_commitment: self.primary.link_commitment.clone(),
        }
    }
}

/// Hash binding every sub-proof to the request nonce.
pub fn aggregate_challenge(nonce: &str, proofs: &[SubProof]) -> Result<Hash, ProofError> {
    let serialized = serde_json::to_vec(proofs)?;
    Ok(tessera_crypto::hash_parts(&[
        b"tessera:aggregate",
        nonce.as_bytes(),
        &serialized,
    ]))
}

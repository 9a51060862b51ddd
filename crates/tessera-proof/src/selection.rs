use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ProofError;
use crate::matcher::CredentialsForProofRequest;
use crate::request::ProofRequest;

fn default_true() -> bool {
    true
}

/// Credential chosen for an attribute referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    pub cred_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default = "default_true")]
    pub revealed: bool,
}

/// Credential chosen for a predicate referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedPredicate {
    pub cred_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// The prover's selection for one proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedCredentials {
    #[serde(default)]
    pub self_attested_attributes: BTreeMap<String, String>,
    #[serde(default, alias = "requested_attrs")]
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, RequestedPredicate>,
}

impl RequestedCredentials {
    pub fn from_json(json: &str) -> Result<Self, ProofError> {
        serde_json::from_str(json).map_err(|e| {
            ProofError::InvalidStructure(format!("malformed requested credentials: {}", e))
        })
    }

    /// Check that every request referent is answered exactly once and nothing
    /// else is.
    pub fn validate(&self, request: &ProofRequest) -> Result<(), ProofError> {
        for referent in self.self_attested_attributes.keys() {
            match request.requested_attributes.get(referent) {
                Some(info) if !info.restrictions.is_unrestricted() => {
                    return Err(ProofError::InvalidStructure(format!(
                        "restricted attribute {} cannot be self-attested",
                        referent
                    )));
                }
                Some(_) => {}
                None if request.requested_predicates.contains_key(referent) => {
                    return Err(ProofError::InvalidStructure(format!(
                        "predicate {} cannot be self-attested",
                        referent
                    )));
                }
                None => {
                    return Err(ProofError::InvalidStructure(format!(
                        "self-attested referent {} is not requested",
                        referent
                    )));
                }
            }
            if self.requested_attributes.contains_key(referent) {
                return Err(ProofError::InvalidStructure(format!(
                    "attribute {} is both self-attested and credential-backed",
                    referent
                )));
            }
        }

        for referent in self.requested_attributes.keys() {
            if !request.requested_attributes.contains_key(referent) {
                return Err(ProofError::InvalidStructure(format!(
                    "attribute referent {} is not requested",
                    referent
                )));
            }
        }
        for referent in self.requested_predicates.keys() {
            if !request.requested_predicates.contains_key(referent) {
                return Err(ProofError::InvalidStructure(format!(
                    "predicate referent {} is not requested",
                    referent
                )));
            }
        }

        for referent in request.requested_attributes.keys() {
            if !self.self_attested_attributes.contains_key(referent)
                && !self.requested_attributes.contains_key(referent)
            {
                return Err(ProofError::InvalidStructure(format!(
                    "no credential selected for attribute {}",
                    referent
                )));
            }
        }
        for referent in request.requested_predicates.keys() {
            if !self.requested_predicates.contains_key(referent) {
                return Err(ProofError::InvalidStructure(format!(
                    "no credential selected for predicate {}",
                    referent
                )));
            }
        }
        Ok(())
    }

    /// `validate`, plus every chosen credential must be one of the matcher's
    /// candidates for its referent.
    pub fn validate_against(
        &self,
        request: &ProofRequest,
        candidates: &CredentialsForProofRequest,
    ) -> Result<(), ProofError> {
        self.validate(request)?;
        for (referent, chosen) in &self.requested_attributes {
            if !candidates.attr_candidate(referent, &chosen.cred_id) {
                return Err(ProofError::InvalidStructure(format!(
                    "credential {} is not a candidate for attribute {}",
                    chosen.cred_id, referent
                )));
            }
        }
        for (referent, chosen) in &self.requested_predicates {
            if !candidates.predicate_candidate(referent, &chosen.cred_id) {
                return Err(ProofError::InvalidStructure(format!(
                    "credential {} is not a candidate for predicate {}",
                    chosen.cred_id, referent
                )));
            }
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tessera_core::{
    normalize_attr_name, AttributeValues, CredentialDefinitionId, RevocationRegistryId, SchemaId,
};
use tessera_crypto::{AttributeCommitment, Blinding, Commitment, Signature};

use crate::definition::CredentialDefinition;
use crate::error::CredentialError;

/// Everything the issuer signs for one credential.
///
/// Commitments are keyed by normalized attribute name. The map ordering makes
/// the serialized form canonical, so prover and verifier derive the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedFields {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    pub rev_reg_id: Option<RevocationRegistryId>,
    pub cred_rev_id: Option<u32>,
    pub commitments: BTreeMap<String, AttributeCommitment>,
    pub link_commitment: Commitment,
}

impl SignedFields {
    /// Canonical bytes covered by the issuer signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>, CredentialError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Check the issuer signature over these fields.
    pub fn verify_signature(
        &self,
        signature: &Signature,
        cred_def: &CredentialDefinition,
    ) -> Result<(), CredentialError> {
        if self.cred_def_id != cred_def.id {
            return Err(CredentialError::InvalidStructure(format!(
                "signed for {} but checked against {}",
                self.cred_def_id, cred_def.id
            )));
        }
        let payload = self.signing_payload()?;
        tessera_crypto::verify(&payload, signature, cred_def.public_key())?;
        Ok(())
    }
}

/// An issued credential as held by the prover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(default)]
    pub rev_reg_id: Option<RevocationRegistryId>,
    #[serde(default)]
    pub cred_rev_id: Option<u32>,
    /// Attribute name (as in the schema) to raw/encoded value.
    pub values: BTreeMap<String, AttributeValues>,
    /// Per-attribute blinding factors, keyed like `values`.
    pub blindings: BTreeMap<String, Blinding>,
    /// Commitment to the holder's master secret.
    pub link_commitment: Commitment,
    pub signature: Signature,
}

impl Credential {
    /// Find an attribute by normalized name.
    pub fn attribute(&self, name: &str) -> Option<(&str, &AttributeValues)> {
        let wanted = normalize_attr_name(name);
        self.values
            .iter()
            .find(|(key, _)| normalize_attr_name(key) == wanted)
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Blinding factor for an attribute, by normalized name.
    pub fn blinding(&self, name: &str) -> Option<&Blinding> {
        let (key, _) = self.attribute(name)?;
        self.blindings.get(key)
    }

    /// Attribute commitments keyed by normalized name.
    pub fn commitments(&self) -> Result<BTreeMap<String, AttributeCommitment>, CredentialError> {
        attribute_commitments(&self.values, &self.blindings)
    }

    pub fn signed_fields(&self) -> Result<SignedFields, CredentialError> {
        Ok(SignedFields {
            schema_id: self.schema_id.clone(),
            cred_def_id: self.cred_def_id.clone(),
            rev_reg_id: self.rev_reg_id.clone(),
            cred_rev_id: self.cred_rev_id,
            commitments: self.commitments()?,
            link_commitment: self.link_commitment.clone(),
        })
    }

    /// Canonical bytes the issuer signed.
    pub fn signing_payload(&self) -> Result<Vec<u8>, CredentialError> {
        self.signed_fields()?.signing_payload()
    }

    /// Check the issuer signature and that every encoded value matches its raw value.
    pub fn verify_signature(&self, cred_def: &CredentialDefinition) -> Result<(), CredentialError> {
        if let Some((name, _)) = self.values.iter().find(|(_, v)| !v.is_consistent()) {
            return Err(CredentialError::InvalidStructure(format!(
                "encoded value of {} does not match its raw value",
                name
            )));
        }
        self.signed_fields()?
            .verify_signature(&self.signature, cred_def)
    }

    /// Candidate-record view of this credential.
    pub fn info(&self, referent: &str) -> CredentialInfo {
        CredentialInfo {
            referent: referent.to_string(),
            attrs: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), value.raw.clone()))
                .collect(),
            schema_id: self.schema_id.clone(),
            cred_def_id: self.cred_def_id.clone(),
            rev_reg_id: self.rev_reg_id.clone(),
            cred_rev_id: self.cred_rev_id,
        }
    }
}

pub(crate) fn attribute_commitments(
    values: &BTreeMap<String, AttributeValues>,
    blindings: &BTreeMap<String, Blinding>,
) -> Result<BTreeMap<String, AttributeCommitment>, CredentialError> {
    values
        .iter()
        .map(|(name, value)| -> Result<(String, AttributeCommitment), CredentialError> {
            let blinding = blindings.get(name).ok_or_else(|| {
                CredentialError::InvalidStructure(format!("no blinding for attribute {}", name))
            })?;
            Ok((
                normalize_attr_name(name),
                AttributeCommitment::for_attribute(&value.encoded, blinding)?,
            ))
        })
        .collect()
}

/// Public description of a stored credential, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialInfo {
    pub referent: String,
    pub attrs: BTreeMap<String, String>,
    pub schema_id: SchemaId,
    pub cred_def_id: CredentialDefinitionId,
    #[serde(default)]
    pub rev_reg_id: Option<RevocationRegistryId>,
    #[serde(default)]
    pub cred_rev_id: Option<u32>,
}

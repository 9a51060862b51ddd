use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use tessera_core::config::RevocationConfig;
use tessera_core::types::SIGNATURE_TYPE;
use tessera_core::{
    normalize_attr_name, AttributeValues, CredentialDefinitionId, RevocationRegistryId, Schema,
    SchemaId,
};
use tessera_crypto::{Blinding, Commitment, KeyPair};

use crate::credential::{attribute_commitments, Credential, SignedFields};
use crate::definition::{CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionValue};
use crate::error::CredentialError;
use crate::revocation::{
    IssuanceType, RevocationRegistryConfig, RevocationRegistryDefinition, RevocationRegistryDelta,
};

/// Issuer-side bookkeeping for one revocation registry.
struct RegistryState {
    def: RevocationRegistryDefinition,
    issued: BTreeSet<u32>,
    revoked: BTreeSet<u32>,
    next_index: u32,
}

impl RegistryState {
    fn delta(&self) -> RevocationRegistryDelta {
        RevocationRegistryDelta::from_sets(&self.issued, &self.revoked)
    }
}

/// Creates schemas, credential definitions and revocation registries, and
/// issues and revokes credentials. Signing keys never leave the issuer.
pub struct Issuer {
    did: String,
    default_max_cred_num: u32,
    schemas: DashMap<SchemaId, Schema>,
    cred_defs: DashMap<CredentialDefinitionId, CredentialDefinition>,
    keys: DashMap<CredentialDefinitionId, KeyPair>,
    registries: DashMap<RevocationRegistryId, RegistryState>,
}

impl Issuer {
    pub fn new(did: impl Into<String>) -> Self {
        Self::with_config(did, &RevocationConfig::default())
    }

    pub fn with_config(did: impl Into<String>, config: &RevocationConfig) -> Self {
        Self {
            did: did.into(),
            default_max_cred_num: config.default_max_cred_num,
            schemas: DashMap::new(),
            cred_defs: DashMap::new(),
            keys: DashMap::new(),
            registries: DashMap::new(),
        }
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// Create and record a schema authored by this issuer.
    pub fn create_schema(
        &self,
        name: &str,
        version: &str,
        attr_names: &[&str],
    ) -> Result<Schema, CredentialError> {
        let schema = Schema::new(&self.did, name, version, attr_names)?;
        if self.schemas.contains_key(&schema.id) {
            return Err(CredentialError::AlreadyExists(schema.id.to_string()));
        }
        self.schemas.insert(schema.id.clone(), schema.clone());
        tracing::info!(issuer = %self.did, schema_id = %schema.id, "schema created");
        Ok(schema)
    }

    /// Create a credential definition over `schema`, which may be authored by
    /// any DID.
    pub fn create_credential_definition(
        &self,
        schema: &Schema,
        tag: &str,
        config: &CredentialDefinitionConfig,
    ) -> Result<CredentialDefinition, CredentialError> {
        if tag.is_empty() {
            return Err(CredentialError::InvalidStructure(
                "credential definition tag must be non-empty".into(),
            ));
        }
        let id = CredentialDefinitionId::build(&self.did, &schema.id, tag);
        if self.cred_defs.contains_key(&id) {
            return Err(CredentialError::AlreadyExists(id.to_string()));
        }

        let keypair = KeyPair::generate();
        let cred_def = CredentialDefinition {
            id: id.clone(),
            schema_id: schema.id.clone(),
            issuer_did: self.did.clone(),
            tag: tag.to_string(),
            signature_type: SIGNATURE_TYPE.to_string(),
            value: CredentialDefinitionValue {
                public_key: keypair.public_key(),
                support_revocation: config.support_revocation,
            },
        };

        self.schemas
            .entry(schema.id.clone())
            .or_insert_with(|| schema.clone());
        self.keys.insert(id.clone(), keypair);
        self.cred_defs.insert(id.clone(), cred_def.clone());

        tracing::info!(
            issuer = %self.did,
            cred_def_id = %id,
            support_revocation = config.support_revocation,
            "credential definition created"
        );
        Ok(cred_def)
    }

    /// Create a revocation registry for a revocable credential definition.
    /// Returns the registry definition and its initial delta.
    pub fn create_revocation_registry(
        &self,
        cred_def_id: &CredentialDefinitionId,
        tag: &str,
        config: &RevocationRegistryConfig,
    ) -> Result<(RevocationRegistryDefinition, RevocationRegistryDelta), CredentialError> {
        let cred_def = self.credential_definition(cred_def_id)?;
        if !cred_def.supports_revocation() {
            return Err(CredentialError::InvalidStructure(format!(
                "credential definition {} does not support revocation",
                cred_def_id
            )));
        }
        let max_cred_num = config.max_cred_num.unwrap_or(self.default_max_cred_num);
        if max_cred_num == 0 {
            return Err(CredentialError::InvalidStructure(
                "max_cred_num must be positive".into(),
            ));
        }

        let id = RevocationRegistryId::build(&self.did, cred_def_id, tag);
        if self.registries.contains_key(&id) {
            return Err(CredentialError::AlreadyExists(id.to_string()));
        }

        let def = RevocationRegistryDefinition {
            id: id.clone(),
            cred_def_id: cred_def_id.clone(),
            tag: tag.to_string(),
            max_cred_num,
            issuance_type: config.issuance_type,
        };
        let issued = match config.issuance_type {
            IssuanceType::IssuanceByDefault => (1..=max_cred_num).collect(),
            IssuanceType::IssuanceOnDemand => BTreeSet::new(),
        };
        let state = RegistryState {
            def: def.clone(),
            issued,
            revoked: BTreeSet::new(),
            next_index: 1,
        };
        let delta = state.delta();
        self.registries.insert(id.clone(), state);

        tracing::info!(rev_reg_id = %id, max_cred_num, "revocation registry created");
        Ok((def, delta))
    }

    /// Issue a credential binding `raw_values` to the holder's link commitment.
    ///
    /// Returns the credential, its revocation index and, when the accumulator
    /// changed, the registry's new delta.
    pub fn issue_credential(
        &self,
        cred_def_id: &CredentialDefinitionId,
        link_commitment: &Commitment,
        raw_values: &BTreeMap<String, String>,
        rev_reg_id: Option<&RevocationRegistryId>,
    ) -> Result<(Credential, Option<u32>, Option<RevocationRegistryDelta>), CredentialError> {
        let cred_def = self.credential_definition(cred_def_id)?;
        let schema = self
            .schemas
            .get(&cred_def.schema_id)
            .map(|s| s.clone())
            .ok_or_else(|| CredentialError::NotFound(cred_def.schema_id.to_string()))?;
        check_values_cover_schema(&schema, raw_values)?;

        let keypair = self
            .keys
            .get(cred_def_id)
            .ok_or_else(|| CredentialError::NotFound(format!("signing key for {}", cred_def_id)))?;

        let (cred_rev_id, delta) = match (cred_def.supports_revocation(), rev_reg_id) {
            (true, Some(rev_reg_id)) => {
                let (idx, delta) = self.allocate_index(cred_def_id, rev_reg_id)?;
                (Some(idx), delta)
            }
            (true, None) => {
                return Err(CredentialError::InvalidStructure(format!(
                    "credential definition {} requires a revocation registry",
                    cred_def_id
                )))
            }
            (false, Some(rev_reg_id)) => {
                return Err(CredentialError::InvalidStructure(format!(
                    "credential definition {} does not support revocation (got {})",
                    cred_def_id, rev_reg_id
                )))
            }
            (false, None) => (None, None),
        };

        let values: BTreeMap<String, AttributeValues> = raw_values
            .iter()
            .map(|(name, raw)| (name.clone(), AttributeValues::from_raw(raw.clone())))
            .collect();
        let blindings: BTreeMap<String, Blinding> = raw_values
            .keys()
            .map(|name| (name.clone(), Blinding::random()))
            .collect();

        let fields = SignedFields {
            schema_id: cred_def.schema_id.clone(),
            cred_def_id: cred_def_id.clone(),
            rev_reg_id: cred_rev_id.and(rev_reg_id.cloned()),
            cred_rev_id,
            commitments: attribute_commitments(&values, &blindings)?,
            link_commitment: link_commitment.clone(),
        };
        let signature = tessera_crypto::sign(&fields.signing_payload()?, &keypair);
        let credential = Credential {
            schema_id: fields.schema_id,
            cred_def_id: fields.cred_def_id,
            rev_reg_id: fields.rev_reg_id,
            cred_rev_id,
            values,
            blindings,
            link_commitment: fields.link_commitment,
            signature,
        };

        tracing::info!(
            issuer = %self.did,
            cred_def_id = %cred_def_id,
            cred_rev_id = ?cred_rev_id,
            "credential issued"
        );
        Ok((credential, cred_rev_id, delta))
    }

    fn allocate_index(
        &self,
        cred_def_id: &CredentialDefinitionId,
        rev_reg_id: &RevocationRegistryId,
    ) -> Result<(u32, Option<RevocationRegistryDelta>), CredentialError> {
        let mut state = self
            .registries
            .get_mut(rev_reg_id)
            .ok_or_else(|| CredentialError::NotFound(rev_reg_id.to_string()))?;
        if state.def.cred_def_id != *cred_def_id {
            return Err(CredentialError::InvalidStructure(format!(
                "revocation registry {} belongs to {}",
                rev_reg_id, state.def.cred_def_id
            )));
        }
        if state.next_index > state.def.max_cred_num {
            return Err(CredentialError::RevocationRegistryFull(rev_reg_id.to_string()));
        }

        let idx = state.next_index;
        state.next_index += 1;
        let delta = match state.def.issuance_type {
            IssuanceType::IssuanceOnDemand => {
                state.issued.insert(idx);
                Some(state.delta())
            }
            IssuanceType::IssuanceByDefault => None,
        };
        Ok((idx, delta))
    }

    /// Remove an issued index from the registry's accumulator.
    pub fn revoke_credential(
        &self,
        rev_reg_id: &RevocationRegistryId,
        cred_rev_id: u32,
    ) -> Result<RevocationRegistryDelta, CredentialError> {
        let mut state = self
            .registries
            .get_mut(rev_reg_id)
            .ok_or_else(|| CredentialError::NotFound(rev_reg_id.to_string()))?;
        if !state.issued.remove(&cred_rev_id) {
            return Err(CredentialError::InvalidStructure(format!(
                "index {} is not issued in {}",
                cred_rev_id, rev_reg_id
            )));
        }
        state.revoked.insert(cred_rev_id);
        tracing::info!(rev_reg_id = %rev_reg_id, cred_rev_id, "credential revoked");
        Ok(state.delta())
    }

    /// Return a previously revoked index to the accumulator.
    pub fn recover_credential(
        &self,
        rev_reg_id: &RevocationRegistryId,
        cred_rev_id: u32,
    ) -> Result<RevocationRegistryDelta, CredentialError> {
        let mut state = self
            .registries
            .get_mut(rev_reg_id)
            .ok_or_else(|| CredentialError::NotFound(rev_reg_id.to_string()))?;
        if !state.revoked.remove(&cred_rev_id) {
            return Err(CredentialError::InvalidStructure(format!(
                "index {} is not revoked in {}",
                cred_rev_id, rev_reg_id
            )));
        }
        state.issued.insert(cred_rev_id);
        tracing::info!(rev_reg_id = %rev_reg_id, cred_rev_id, "credential recovered");
        Ok(state.delta())
    }

    pub fn schema(&self, id: &SchemaId) -> Result<Schema, CredentialError> {
        self.schemas
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }

    pub fn credential_definition(
        &self,
        id: &CredentialDefinitionId,
    ) -> Result<CredentialDefinition, CredentialError> {
        self.cred_defs
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }

    pub fn revocation_registry_definition(
        &self,
        id: &RevocationRegistryId,
    ) -> Result<RevocationRegistryDefinition, CredentialError> {
        self.registries
            .get(id)
            .map(|s| s.def.clone())
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }

    /// Current cumulative delta of a registry.
    pub fn revocation_registry_delta(
        &self,
        id: &RevocationRegistryId,
    ) -> Result<RevocationRegistryDelta, CredentialError> {
        self.registries
            .get(id)
            .map(|s| s.delta())
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }
}

/// Values must name every schema attribute exactly once (normalized).
fn check_values_cover_schema(
    schema: &Schema,
    raw_values: &BTreeMap<String, String>,
) -> Result<(), CredentialError> {
    let mut seen = HashSet::new();
    for name in raw_values.keys() {
        if !schema.has_attribute(name) {
            return Err(CredentialError::InvalidStructure(format!(
                "attribute {} is not in schema {}",
                name, schema.id
            )));
        }
        if !seen.insert(normalize_attr_name(name)) {
            return Err(CredentialError::InvalidStructure(format!(
                "attribute {} given twice",
                name
            )));
        }
    }
    if seen.len() != schema.attr_names.len() {
        return Err(CredentialError::InvalidStructure(format!(
            "values cover {} of {} attributes of schema {}",
            seen.len(),
            schema.attr_names.len(),
            schema.id
        )));
    }
    Ok(())
}

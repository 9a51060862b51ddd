//! Proof construction from a validated credential selection.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tessera_core::{
    normalize_attr_name, AttributeValues, EngineConfig, NonRevokedInterval, PredicateType, Schema,
};
use tessera_credentials::{
    Credential, CredentialDefinition, CredentialStore, MasterSecret, RevocationState,
};
use tessera_crypto::{Blinding, MembershipProof, PredicateProof};

use crate::error::ProofError;
use crate::proof::{
    aggregate_challenge, AggregatedProof, Identifier, PrimaryProof, Proof, ProofData,
    RequestedProof, RevealedAttribute, RevealedOpening, SubProof, SubProofReference,
};
use crate::request::{ProofRequest, Restrictions};
use crate::selection::RequestedCredentials;

/// Schemas supplied to the builder, keyed by credential id.
pub type SchemasByCredential = HashMap<String, Schema>;
/// Credential definitions supplied to the builder, keyed by credential id.
pub type CredentialDefsByCredential = HashMap<String, CredentialDefinition>;
/// Revocation states supplied to the builder: credential id, then timestamp.
pub type RevocationStatesByCredential = HashMap<String, HashMap<u64, RevocationState>>;

/// Public inputs the prover must supply alongside the store.
pub struct ProverInputs<'a> {
    pub schemas: &'a SchemasByCredential,
    pub credential_defs: &'a CredentialDefsByCredential,
    pub revocation_states: &'a RevocationStatesByCredential,
}

/// Everything one sub-proof needs, gathered during validation.
struct Group {
    cred_id: String,
    credential: Credential,
    identifier: Identifier,
    rev_state: Option<RevocationState>,
    revealed: BTreeSet<String>,
    predicates: Vec<(String, PredicateType, i64)>,
}

/// Builds proofs; holds the revocation policy from configuration.
#[derive(Debug, Clone)]
pub struct ProofBuilder {
    require_timestamp: bool,
}

impl Default for ProofBuilder {
    fn default() -> Self {
        Self {
            require_timestamp: true,
        }
    }
}

impl ProofBuilder {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            require_timestamp: config.revocation.require_timestamp,
        }
    }

    /// Build a proof. Every check runs before any proof material is computed,
    /// so a failure leaves nothing behind.
    pub fn build<S>(
        &self,
        store: &S,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        master_secret_id: &str,
        inputs: &ProverInputs<'_>,
    ) -> Result<Proof, ProofError>
    where
        S: CredentialStore + ?Sized,
    {
        request.validate()?;
        requested.validate(request)?;

        let master_secret = store.get_master_secret(master_secret_id)?;
        let mut plan = Plan {
            builder: self,
            store,
            inputs,
            master_secret: &master_secret,
            groups: Vec::new(),
        };
        let mut requested_proof = RequestedProof::default();

        for (referent, chosen) in &requested.requested_attributes {
            let info = request.requested_attributes.get(referent).ok_or_else(|| {
                ProofError::InvalidStructure(format!("attribute {} is not requested", referent))
            })?;
            let idx = plan.group_for(
                &chosen.cred_id,
                chosen.timestamp,
                request.attribute_interval(referent),
                &info.restrictions,
            )?;
            let group = &mut plan.groups[idx];
            let (_, values) = group.credential.attribute(&info.name).ok_or_else(|| {
                ProofError::InvalidStructure(format!(
                    "credential {} has no attribute {}",
                    chosen.cred_id, info.name
                ))
            })?;
            if chosen.revealed {
                let normalized = normalize_attr_name(&info.name);
                requested_proof.revealed_attrs.insert(
                    referent.clone(),
                    RevealedAttribute {
                        sub_proof_index: idx,
                        raw: values.raw.clone(),
                        encoded: values.encoded.clone(),
                    },
                );
                group.revealed.insert(normalized);
            } else {
                requested_proof
                    .unrevealed_attrs
                    .insert(referent.clone(), SubProofReference { sub_proof_index: idx });
            }
        }

        for (referent, chosen) in &requested.requested_predicates {
            let info = request.requested_predicates.get(referent).ok_or_else(|| {
                ProofError::InvalidStructure(format!("predicate {} is not requested", referent))
            })?;
            let idx = plan.group_for(
                &chosen.cred_id,
                chosen.timestamp,
                request.predicate_interval(referent),
                &info.restrictions,
            )?;
            let group = &mut plan.groups[idx];
            let satisfied = group
                .credential
                .attribute(&info.name)
                .and_then(|(_, v)| v.encoded_as_i64())
                .map(|value| info.p_type.holds(value, info.p_value))
                .unwrap_or(false);
            if !satisfied {
                return Err(ProofError::InvalidStructure(format!(
                    "credential {} does not satisfy {} {} {}",
                    chosen.cred_id, info.name, info.p_type, info.p_value
                )));
            }
            group
                .predicates
                .push((normalize_attr_name(&info.name), info.p_type, info.p_value));
            requested_proof
                .predicates
                .insert(referent.clone(), SubProofReference { sub_proof_index: idx });
        }

        requested_proof.self_attested_attrs = requested.self_attested_attributes.clone();

        // Validation done; compute proof material.
        let nonce = request.nonce.as_bytes();
        let mut proofs = Vec::with_capacity(plan.groups.len());
        let mut identifiers = Vec::with_capacity(plan.groups.len());
        for group in plan.groups {
            let sub_proof = prove_group(&group, nonce)?;
            tracing::debug!(
                cred_id = %group.cred_id,
                revealed = group.revealed.len(),
                predicates = group.predicates.len(),
                non_revoc = sub_proof.non_revoc.is_some(),
                "sub-proof built"
            );
            proofs.push(sub_proof);
            identifiers.push(group.identifier);
        }

        let c_hash = aggregate_challenge(&request.nonce, &proofs)?;
        tracing::info!(
            request = %request.name,
            sub_proofs = proofs.len(),
            revealed = requested_proof.revealed_attrs.len(),
            predicates = requested_proof.predicates.len(),
            "proof created"
        );

        Ok(Proof {
            proof: ProofData {
                proofs,
                aggregated_proof: AggregatedProof { c_hash },
            },
            requested_proof,
            identifiers,
        })
    }
}

struct Plan<'a, S: ?Sized> {
    builder: &'a ProofBuilder,
    store: &'a S,
    inputs: &'a ProverInputs<'a>,
    master_secret: &'a MasterSecret,
    groups: Vec<Group>,
}

impl<'a, S> Plan<'a, S>
where
    S: CredentialStore + ?Sized,
{
    /// Validate the chosen credential for one referent and return the index of
    /// the sub-proof that will cover it.
    fn group_for(
        &mut self,
        cred_id: &str,
        timestamp: Option<u64>,
        interval: Option<NonRevokedInterval>,
        restrictions: &Restrictions,
    ) -> Result<usize, ProofError> {
        let credential = self.store.get_credential(cred_id)?;

        let schema = self.inputs.schemas.get(cred_id).ok_or_else(|| {
            ProofError::InvalidStructure(format!("no schema supplied for credential {}", cred_id))
        })?;
        if schema.id != credential.schema_id {
            return Err(ProofError::InvalidStructure(format!(
                "schema {} supplied for credential {} issued under {}",
                schema.id, cred_id, credential.schema_id
            )));
        }
        let cred_def = self.inputs.credential_defs.get(cred_id).ok_or_else(|| {
            ProofError::InvalidStructure(format!(
                "no credential definition supplied for credential {}",
                cred_id
            ))
        })?;
        if cred_def.id != credential.cred_def_id {
            return Err(ProofError::InvalidStructure(format!(
                "credential definition {} supplied for credential {} issued under {}",
                cred_def.id, cred_id, credential.cred_def_id
            )));
        }
        if !restrictions.matches(&credential.info(cred_id)) {
            return Err(ProofError::InvalidStructure(format!(
                "credential {} does not satisfy the restrictions",
                cred_id
            )));
        }
        if credential.link_commitment != self.master_secret.commitment() {
            return Err(ProofError::InvalidStructure(format!(
                "credential {} is not linked to the given master secret",
                cred_id
            )));
        }

        let revocable = cred_def.supports_revocation() && credential.rev_reg_id.is_some();
        let (timestamp, rev_state) = match (revocable, timestamp) {
            (true, Some(ts)) => {
                let state = self
                    .inputs
                    .revocation_states
                    .get(cred_id)
                    .and_then(|by_ts| by_ts.get(&ts))
                    .ok_or_else(|| {
                        ProofError::InvalidStructure(format!(
                            "no revocation state supplied for credential {} at {}",
                            cred_id, ts
                        ))
                    })?;
                if Some(state.cred_rev_id) != credential.cred_rev_id {
                    return Err(ProofError::InvalidStructure(format!(
                        "revocation state for index {} supplied for credential {}",
                        state.cred_rev_id, cred_id
                    )));
                }
                if !state.witness.is_valid_for(&state.rev_reg.accum) {
                    return Err(ProofError::InvalidStructure(format!(
                        "revocation state of credential {} at {} is inconsistent",
                        cred_id, ts
                    )));
                }
                (Some(ts), Some(state.clone()))
            }
            (true, None) if self.builder.require_timestamp || interval.is_some() => {
                return Err(ProofError::InvalidStructure(format!(
                    "credential {} is revocable; a timestamp is required",
                    cred_id
                )));
            }
            _ => (None, None),
        };

        if let (Some(interval), Some(ts)) = (interval, timestamp) {
            if !interval.contains(ts) {
                return Err(ProofError::InvalidStructure(format!(
                    "timestamp {} of credential {} is outside the requested interval",
                    ts, cred_id
                )));
            }
        }

        if let Some(idx) = self
            .groups
            .iter()
            .position(|g| g.cred_id == cred_id && g.identifier.timestamp == timestamp)
        {
            return Ok(idx);
        }

        self.groups.push(Group {
            cred_id: cred_id.to_string(),
            identifier: Identifier {
                schema_id: credential.schema_id.clone(),
                cred_def_id: credential.cred_def_id.clone(),
                rev_reg_id: credential.rev_reg_id.clone().filter(|_| revocable),
                timestamp,
            },
            credential,
            rev_state,
            revealed: BTreeSet::new(),
            predicates: Vec::new(),
        });
        Ok(self.groups.len() - 1)
    }
}

fn prove_group(group: &Group, nonce: &[u8]) -> Result<SubProof, ProofError> {
    let credential = &group.credential;
    let commitments = credential.commitments()?;

    let mut revealed = BTreeMap::new();
    for name in &group.revealed {
        let (values, blinding) = opening(credential, name)?;
        revealed.insert(
            name.clone(),
            RevealedOpening {
                encoded: values.encoded.clone(),
                blinding: blinding.clone(),
            },
        );
    }

    let predicates = group
        .predicates
        .iter()
        .map(|(name, p_type, p_value)| -> Result<PredicateProof, ProofError> {
            let (values, blinding) = opening(credential, name)?;
            Ok(PredicateProof::prove(
                name,
                &values.encoded,
                blinding,
                *p_type,
                *p_value,
                nonce,
            )?)
        })
        .collect::<Result<Vec<_>, ProofError>>()?;

    let non_revoc = group
        .rev_state
        .as_ref()
        .map(|state| MembershipProof::prove(&state.witness, &state.rev_reg.accum, nonce))
        .transpose()?;

    Ok(SubProof {
        primary: PrimaryProof {
            commitments,
            revealed,
            cred_rev_id: credential.cred_rev_id,
            link_commitment: credential.link_commitment.clone(),
            signature: credential.signature.clone(),
            predicates,
        },
        non_revoc,
    })
}

fn opening<'c>(
    credential: &'c Credential,
    name: &str,
) -> Result<(&'c AttributeValues, &'c Blinding), ProofError> {
    let (_, values) = credential
        .attribute(name)
        .ok_or_else(|| ProofError::InvalidStructure(format!("attribute {} missing", name)))?;
    let blinding = credential
        .blinding(name)
        .ok_or_else(|| ProofError::InvalidStructure(format!("blinding for {} missing", name)))?;
    Ok((values, blinding))
}

/// Build a proof with the default revocation policy.
pub fn build_proof<S>(
    store: &S,
    request: &ProofRequest,
    requested: &RequestedCredentials,
    master_secret_id: &str,
    schemas: &SchemasByCredential,
    credential_defs: &CredentialDefsByCredential,
    revocation_states: &RevocationStatesByCredential,
) -> Result<Proof, ProofError>
where
    S: CredentialStore + ?Sized,
{
    ProofBuilder::default().build(
        store,
        request,
        requested,
        master_secret_id,
        &ProverInputs {
            schemas,
            credential_defs,
            revocation_states,
        },
    )
}

//! Proof verification against a request and public parameters.

use std::collections::{BTreeSet, HashMap};

use tessera_core::{
    encode_attribute_value, normalize_attr_name, CredentialDefinitionId, NonRevokedInterval,
    RevocationRegistryId, Schema, SchemaId,
};
use tessera_credentials::{CredentialDefinition, RevocationRegistry, RevocationRegistryDefinition};

use crate::error::ProofError;
use crate::proof::{aggregate_challenge, Identifier, Proof, SubProof};
use crate::request::{ProofRequest, Restrictions};

pub type SchemasById = HashMap<SchemaId, Schema>;
pub type CredentialDefsById = HashMap<CredentialDefinitionId, CredentialDefinition>;
pub type RevocationRegistryDefsById = HashMap<RevocationRegistryId, RevocationRegistryDefinition>;
/// Registry values by registry id, then timestamp.
pub type RevocationRegistriesById = HashMap<RevocationRegistryId, HashMap<u64, RevocationRegistry>>;

enum Failure {
    /// Public parameters missing or request malformed: surfaced as an error.
    Malformed(ProofError),
    /// The proof does not hold: surfaced as `false`.
    Rejected(String),
}

impl From<ProofError> for Failure {
    fn from(e: ProofError) -> Self {
        Self::Malformed(e)
    }
}

macro_rules! reject {
    ($($arg:tt)*) => {
        return Err(Failure::Rejected(format!($($arg)*)))
    };
}

/// Public parameters resolved for one sub-proof.
struct Context<'p> {
    cred_def: &'p CredentialDefinition,
    registry: Option<(&'p RevocationRegistryDefinition, &'p RevocationRegistry)>,
}

/// Verify a proof. Returns `Ok(false)` for any proof that does not hold and an
/// error when the request is malformed or public parameters are missing.
/// Inputs are never modified.
pub fn verify_proof(
    request: &ProofRequest,
    proof: &Proof,
    schemas: &SchemasById,
    credential_defs: &CredentialDefsById,
    revocation_registry_defs: &RevocationRegistryDefsById,
    revocation_registries: &RevocationRegistriesById,
) -> Result<bool, ProofError> {
    let outcome = check(
        request,
        proof,
        schemas,
        credential_defs,
        revocation_registry_defs,
        revocation_registries,
    );
    match outcome {
        Ok(()) => {
            tracing::debug!(request = %request.name, "proof verified");
            Ok(true)
        }
        Err(Failure::Rejected(reason)) => {
            tracing::warn!(request = %request.name, reason = %reason, "proof rejected");
            Ok(false)
        }
        Err(Failure::Malformed(e)) => Err(e),
    }
}

fn check(
    request: &ProofRequest,
    proof: &Proof,
    schemas: &SchemasById,
    credential_defs: &CredentialDefsById,
    revocation_registry_defs: &RevocationRegistryDefsById,
    revocation_registries: &RevocationRegistriesById,
) -> Result<(), Failure> {
    request.validate()?;

    let sub_proofs = &proof.proof.proofs;
    if sub_proofs.len() != proof.identifiers.len() {
        reject!(
            "{} sub-proofs but {} identifiers",
            sub_proofs.len(),
            proof.identifiers.len()
        );
    }

    let contexts = proof
        .identifiers
        .iter()
        .map(|id| {
            resolve(
                id,
                schemas,
                credential_defs,
                revocation_registry_defs,
                revocation_registries,
            )
        })
        .collect::<Result<Vec<_>, ProofError>>()?;

    check_completeness(request, proof)?;

    let expected = aggregate_challenge(&request.nonce, sub_proofs)?;
    if expected != proof.proof.aggregated_proof.c_hash {
        reject!("aggregated challenge does not match the request nonce");
    }

    if let Some(first) = sub_proofs.first() {
        if sub_proofs
            .iter()
            .any(|p| p.primary.link_commitment != first.primary.link_commitment)
        {
            reject!("sub-proofs are not linked to the same master secret");
        }
    }

    let nonce = request.nonce.as_bytes();
    for (idx, ((sub_proof, identifier), context)) in sub_proofs
        .iter()
        .zip(&proof.identifiers)
        .zip(&contexts)
        .enumerate()
    {
        check_sub_proof(idx, sub_proof, identifier, context, nonce)?;
    }

    check_referents(request, proof)?;
    Ok(())
}

fn resolve<'p>(
    identifier: &Identifier,
    schemas: &'p SchemasById,
    credential_defs: &'p CredentialDefsById,
    revocation_registry_defs: &'p RevocationRegistryDefsById,
    revocation_registries: &'p RevocationRegistriesById,
) -> Result<Context<'p>, ProofError> {
    if !schemas.contains_key(&identifier.schema_id) {
        return Err(ProofError::InvalidStructure(format!(
            "schema {} not supplied",
            identifier.schema_id
        )));
    }
    let cred_def = credential_defs.get(&identifier.cred_def_id).ok_or_else(|| {
        ProofError::InvalidStructure(format!(
            "credential definition {} not supplied",
            identifier.cred_def_id
        ))
    })?;

    let registry = match (&identifier.rev_reg_id, identifier.timestamp) {
        (Some(rev_reg_id), Some(timestamp)) => {
            let def = revocation_registry_defs.get(rev_reg_id).ok_or_else(|| {
                ProofError::InvalidStructure(format!(
                    "revocation registry definition {} not supplied",
                    rev_reg_id
                ))
            })?;
            let registry = revocation_registries
                .get(rev_reg_id)
                .and_then(|by_ts| by_ts.get(&timestamp))
                .ok_or_else(|| {
                    ProofError::InvalidStructure(format!(
                        "revocation registry {} at {} not supplied",
                        rev_reg_id, timestamp
                    ))
                })?;
            Some((def, registry))
        }
        _ => None,
    };

    Ok(Context { cred_def, registry })
}

/// Every requested referent is answered exactly once and nothing else is.
fn check_completeness(request: &ProofRequest, proof: &Proof) -> Result<(), Failure> {
    let rp = &proof.requested_proof;
    let mut answered = BTreeSet::new();
    let attr_referents = rp
        .revealed_attrs
        .keys()
        .chain(rp.unrevealed_attrs.keys())
        .chain(rp.self_attested_attrs.keys());
    for referent in attr_referents {
        if !answered.insert(referent) {
            reject!("attribute {} answered more than once", referent);
        }
    }
    let requested: BTreeSet<&String> = request.requested_attributes.keys().collect();
    if answered != requested {
        reject!("answered attributes do not match the request");
    }

    let predicates: BTreeSet<&String> = rp.predicates.keys().collect();
    let requested: BTreeSet<&String> = request.requested_predicates.keys().collect();
    if predicates != requested {
        reject!("answered predicates do not match the request");
    }

    let count = proof.proof.proofs.len();
    let indices = rp
        .revealed_attrs
        .values()
        .map(|a| a.sub_proof_index)
        .chain(rp.unrevealed_attrs.values().map(|a| a.sub_proof_index))
        .chain(rp.predicates.values().map(|p| p.sub_proof_index));
    for idx in indices {
        if idx >= count {
            reject!("sub-proof index {} out of range", idx);
        }
    }
    Ok(())
}

fn check_sub_proof(
    idx: usize,
    sub_proof: &SubProof,
    identifier: &Identifier,
    context: &Context<'_>,
    nonce: &[u8],
) -> Result<(), Failure> {
    let cred_def = context.cred_def;
    if cred_def.schema_id != identifier.schema_id {
        reject!(
            "sub-proof {}: definition {} is not over schema {}",
            idx,
            cred_def.id,
            identifier.schema_id
        );
    }
    if identifier.rev_reg_id.is_some() && !cred_def.supports_revocation() {
        reject!("sub-proof {}: definition {} is not revocable", idx, cred_def.id);
    }

    let fields = sub_proof.signed_fields(identifier);
    if fields
        .verify_signature(&sub_proof.primary.signature, cred_def)
        .is_err()
    {
        reject!("sub-proof {}: issuer signature does not verify", idx);
    }

    for (name, opening) in &sub_proof.primary.revealed {
        let opens = sub_proof
            .primary
            .commitments
            .get(name)
            .map(|c| c.opens(&opening.encoded, &opening.blinding))
            .unwrap_or(false);
        if !opens {
            reject!("sub-proof {}: revealed {} does not open its commitment", idx, name);
        }
    }

    for predicate in &sub_proof.primary.predicates {
        let verified = sub_proof
            .primary
            .commitments
            .get(&predicate.attr_name)
            .map(|c| predicate.verify(c, nonce))
            .unwrap_or(false);
        if !verified {
            reject!(
                "sub-proof {}: predicate {} {} {} does not verify",
                idx,
                predicate.attr_name,
                predicate.p_type,
                predicate.p_value
            );
        }
    }

    match (context.registry, &sub_proof.non_revoc) {
        (Some((def, registry)), Some(non_revoc)) => {
            if def.cred_def_id != identifier.cred_def_id {
                reject!("sub-proof {}: registry {} belongs to another definition", idx, def.id);
            }
            if sub_proof.primary.cred_rev_id != Some(non_revoc.index) {
                reject!("sub-proof {}: non-revocation proof is for another index", idx);
            }
            if !non_revoc.verify(&registry.accum, nonce) {
                reject!("sub-proof {}: credential not in the registry accumulator", idx);
            }
        }
        (Some(_), None) => reject!("sub-proof {}: non-revocation proof missing", idx),
        (None, Some(_)) => reject!("sub-proof {}: unexpected non-revocation proof", idx),
        (None, None) => {
            if identifier.timestamp.is_some() {
                reject!("sub-proof {}: timestamp without revocation registry", idx);
            }
        }
    }
    Ok(())
}

/// Per-referent checks: revealed values, predicate parameters, restrictions
/// and non-revocation intervals.
fn check_referents(request: &ProofRequest, proof: &Proof) -> Result<(), Failure> {
    let rp = &proof.requested_proof;
    let sub_proofs = &proof.proof.proofs;

    for (referent, revealed) in &rp.revealed_attrs {
        let Some(info) = request.requested_attributes.get(referent) else {
            reject!("attribute {} is not requested", referent);
        };
        let idx = revealed.sub_proof_index;
        let name = normalize_attr_name(&info.name);
        let matches_opening = sub_proofs[idx]
            .primary
            .revealed
            .get(&name)
            .map(|o| o.encoded == revealed.encoded)
            .unwrap_or(false);
        if !matches_opening {
            reject!("revealed {} does not match sub-proof {}", referent, idx);
        }
        if encode_attribute_value(&revealed.raw) != revealed.encoded {
            reject!("raw value of {} does not match its encoding", referent);
        }
        check_binding(
            referent,
            &proof.identifiers[idx],
            &info.restrictions,
            request.attribute_interval(referent),
        )?;
    }

    for (referent, unrevealed) in &rp.unrevealed_attrs {
        let Some(info) = request.requested_attributes.get(referent) else {
            reject!("attribute {} is not requested", referent);
        };
        let idx = unrevealed.sub_proof_index;
        if !sub_proofs[idx]
            .primary
            .commitments
            .contains_key(&normalize_attr_name(&info.name))
        {
            reject!("sub-proof {} has no attribute {}", idx, info.name);
        }
        check_binding(
            referent,
            &proof.identifiers[idx],
            &info.restrictions,
            request.attribute_interval(referent),
        )?;
    }

    for referent in rp.self_attested_attrs.keys() {
        let restricted = request
            .requested_attributes
            .get(referent)
            .map(|info| !info.restrictions.is_unrestricted())
            .unwrap_or(true);
        if restricted {
            reject!("self-attested {} is restricted", referent);
        }
    }

    for (referent, reference) in &rp.predicates {
        let Some(info) = request.requested_predicates.get(referent) else {
            reject!("predicate {} is not requested", referent);
        };
        let idx = reference.sub_proof_index;
        let name = normalize_attr_name(&info.name);
        let present = sub_proofs[idx].primary.predicates.iter().any(|p| {
            p.attr_name == name && p.p_type == info.p_type && p.p_value == info.p_value
        });
        if !present {
            reject!("sub-proof {} has no proof for predicate {}", idx, referent);
        }
        check_binding(
            referent,
            &proof.identifiers[idx],
            &info.restrictions,
            request.predicate_interval(referent),
        )?;
    }
    Ok(())
}

fn check_binding(
    referent: &str,
    identifier: &Identifier,
    restrictions: &Restrictions,
    interval: Option<NonRevokedInterval>,
) -> Result<(), Failure> {
    if !restrictions.matches_ids(&identifier.schema_id, &identifier.cred_def_id) {
        reject!("{} comes from a credential outside its restrictions", referent);
    }
    if let (Some(interval), Some(_)) = (interval, &identifier.rev_reg_id) {
        match identifier.timestamp {
            Some(ts) if interval.contains(ts) => {}
            Some(ts) => reject!("{}: timestamp {} outside the requested interval", referent, ts),
            None => reject!("{}: non-revocation requested but no timestamp", referent),
        }
    }
    Ok(())
}

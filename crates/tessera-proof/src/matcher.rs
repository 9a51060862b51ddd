//! Resolve which stored credentials can satisfy each item of a proof request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tessera_core::config::MatcherConfig;
use tessera_core::NonRevokedInterval;
use tessera_credentials::{CredentialHandle, CredentialInfo, CredentialStore};

use crate::error::ProofError;
use crate::request::{ProofRequest, Restrictions};

/// One candidate credential for a referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedCredential {
    pub cred_info: CredentialInfo,
    #[serde(default)]
    pub interval: Option<NonRevokedInterval>,
}

/// Candidates per referent, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsForProofRequest {
    #[serde(default)]
    pub attrs: BTreeMap<String, Vec<RequestedCredential>>,
    #[serde(default)]
    pub predicates: BTreeMap<String, Vec<RequestedCredential>>,
}

impl CredentialsForProofRequest {
    pub fn attr_candidate(&self, referent: &str, cred_id: &str) -> bool {
        Self::contains(&self.attrs, referent, cred_id)
    }

    pub fn predicate_candidate(&self, referent: &str, cred_id: &str) -> bool {
        Self::contains(&self.predicates, referent, cred_id)
    }

    fn contains(
        map: &BTreeMap<String, Vec<RequestedCredential>>,
        referent: &str,
        cred_id: &str,
    ) -> bool {
        map.get(referent)
            .map(|candidates| candidates.iter().any(|c| c.cred_info.referent == cred_id))
            .unwrap_or(false)
    }
}

/// List the stored credentials that can satisfy every requested attribute
/// and predicate.
///
/// A referent nobody can satisfy gets an empty list. Store failures (closed
/// handle) propagate unchanged.
pub fn resolve_candidates<S>(
    store: &S,
    request: &ProofRequest,
    config: &MatcherConfig,
) -> Result<CredentialsForProofRequest, ProofError>
where
    S: CredentialStore + ?Sized,
{
    request.validate()?;
    let mut result = CredentialsForProofRequest::default();

    for (referent, info) in &request.requested_attributes {
        let handles = store.find_credentials_by_attribute(&info.name)?;
        let candidates = collect(
            store,
            handles,
            &info.name,
            &info.restrictions,
            request.attribute_interval(referent),
            config,
        )?;
        tracing::debug!(referent = %referent, attr = %info.name, count = candidates.len(), "attribute candidates");
        result.attrs.insert(referent.clone(), candidates);
    }

    for (referent, info) in &request.requested_predicates {
        let handles = store.find_credentials_by_predicate(&info.name, info.p_type, info.p_value)?;
        let candidates = collect(
            store,
            handles,
            &info.name,
            &info.restrictions,
            request.predicate_interval(referent),
            config,
        )?;
        tracing::debug!(
            referent = %referent,
            attr = %info.name,
            p_type = %info.p_type,
            p_value = info.p_value,
            count = candidates.len(),
            "predicate candidates"
        );
        result.predicates.insert(referent.clone(), candidates);
    }

    Ok(result)
}

fn collect<S>(
    store: &S,
    handles: Vec<CredentialHandle>,
    attr_name: &str,
    restrictions: &Restrictions,
    interval: Option<NonRevokedInterval>,
    config: &MatcherConfig,
) -> Result<Vec<RequestedCredential>, ProofError>
where
    S: CredentialStore + ?Sized,
{
    let mut candidates = Vec::new();
    for handle in handles {
        let cred_info = store.get_credential_info(&handle)?;
        if !config.normalize_names && !cred_info.attrs.contains_key(attr_name) {
            continue;
        }
        if !restrictions.matches(&cred_info) {
            continue;
        }
        candidates.push(RequestedCredential {
            cred_info,
            interval,
        });
        if config
            .max_candidates_per_referent
            .is_some_and(|max| candidates.len() >= max)
        {
            break;
        }
    }
    Ok(candidates)
}

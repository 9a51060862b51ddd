use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tessera_core::{PredicateType, RevocationRegistryId};

use crate::credential::{Credential, CredentialInfo};
use crate::definition::CredentialDefinition;
use crate::error::CredentialError;
use crate::filter::CredentialFilter;
use crate::master_secret::MasterSecret;
use crate::revocation::RevocationState;
use crate::store::{CredentialHandle, CredentialStore};

#[derive(Debug)]
struct StoredCredential {
    seq: u64,
    credential: Credential,
}

/// In-memory prover wallet: credentials, master secrets and revocation states.
///
/// Listings are ordered by insertion. The order is stable for identical
/// contents but carries no further meaning.
#[derive(Debug)]
pub struct Wallet {
    owner: String,
    open: AtomicBool,
    next_seq: AtomicU64,
    credentials: DashMap<String, StoredCredential>,
    master_secrets: DashMap<String, MasterSecret>,
    revocation_states: DashMap<(RevocationRegistryId, u64), RevocationState>,
}

impl Wallet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            open: AtomicBool::new(true),
            next_seq: AtomicU64::new(0),
            credentials: DashMap::new(),
            master_secrets: DashMap::new(),
            revocation_states: DashMap::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn ensure_open(&self) -> Result<(), CredentialError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CredentialError::InvalidHandle(format!(
                "wallet of {} is closed",
                self.owner
            )))
        }
    }

    /// Close the wallet. Every later operation fails with `InvalidHandle`.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        tracing::debug!(owner = %self.owner, "wallet closed");
    }

    /// Create a master secret, generating an id when none is given.
    pub fn create_master_secret(&self, id: Option<&str>) -> Result<String, CredentialError> {
        self.ensure_open()?;
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        match self.master_secrets.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(CredentialError::DuplicateMasterSecret(id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(MasterSecret::generate());
                tracing::debug!(owner = %self.owner, master_secret_id = %id, "master secret created");
                Ok(id)
            }
        }
    }

    /// Store a credential after checking its issuer signature and that it is
    /// linked to one of this wallet's master secrets.
    pub fn store_credential(
        &self,
        id: Option<&str>,
        credential: Credential,
        cred_def: &CredentialDefinition,
    ) -> Result<String, CredentialError> {
        self.ensure_open()?;
        credential.verify_signature(cred_def)?;

        let linked = self
            .master_secrets
            .iter()
            .any(|entry| entry.value().commitment() == credential.link_commitment);
        if !linked {
            return Err(CredentialError::InvalidStructure(
                "credential is not linked to any master secret in this wallet".into(),
            ));
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        match self.credentials.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CredentialError::AlreadyExists(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                slot.insert(StoredCredential { seq, credential });
                tracing::debug!(owner = %self.owner, credential_id = %id, "credential stored in wallet");
                Ok(id)
            }
        }
    }

    /// Store a revocation state under its registry and timestamp.
    pub fn store_revocation_state(
        &self,
        rev_reg_id: &RevocationRegistryId,
        state: RevocationState,
    ) -> Result<(), CredentialError> {
        self.ensure_open()?;
        let timestamp = state.timestamp;
        self.revocation_states
            .insert((rev_reg_id.clone(), timestamp), state);
        tracing::debug!(rev_reg_id = %rev_reg_id, timestamp, "revocation state stored");
        Ok(())
    }

    /// Credential infos matching `filter`, in insertion order.
    pub fn get_credentials(
        &self,
        filter: &CredentialFilter,
    ) -> Result<Vec<CredentialInfo>, CredentialError> {
        self.ensure_open()?;
        let mut matched: Vec<(u64, CredentialInfo)> = self
            .credentials
            .iter()
            .map(|entry| (entry.seq, entry.credential.info(entry.key())))
            .filter(|(_, info)| filter.matches(info))
            .collect();
        matched.sort_by_key(|(seq, _)| *seq);
        Ok(matched.into_iter().map(|(_, info)| info).collect())
    }

    pub fn delete_credential(&self, id: &str) -> Result<(), CredentialError> {
        self.ensure_open()?;
        self.credentials
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CredentialError::NotFound(format!("credential {}", id)))
    }

    pub fn credential_count(&self) -> Result<usize, CredentialError> {
        self.ensure_open()?;
        Ok(self.credentials.len())
    }

    /// Handles of credentials accepted by `pred`, in insertion order.
    fn find_by(&self, pred: impl Fn(&Credential) -> bool) -> Vec<CredentialHandle> {
        let mut found: Vec<(u64, CredentialHandle)> = self
            .credentials
            .iter()
            .filter(|entry| pred(&entry.credential))
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl CredentialStore for Wallet {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn find_credentials_by_attribute(
        &self,
        name: &str,
    ) -> Result<Vec<CredentialHandle>, CredentialError> {
        self.ensure_open()?;
        Ok(self.find_by(|credential| credential.attribute(name).is_some()))
    }

    fn find_credentials_by_predicate(
        &self,
        name: &str,
        p_type: PredicateType,
        threshold: i64,
    ) -> Result<Vec<CredentialHandle>, CredentialError> {
        self.ensure_open()?;
        Ok(self.find_by(|credential| {
            credential
                .attribute(name)
                .and_then(|(_, value)| value.encoded_as_i64())
                .map(|value| p_type.holds(value, threshold))
                .unwrap_or(false)
        }))
    }

    fn get_credential(&self, handle: &str) -> Result<Credential, CredentialError> {
        self.ensure_open()?;
        self.credentials
            .get(handle)
            .map(|entry| entry.credential.clone())
            .ok_or_else(|| CredentialError::NotFound(format!("credential {}", handle)))
    }

    fn get_credential_info(&self, handle: &str) -> Result<CredentialInfo, CredentialError> {
        self.ensure_open()?;
        self.credentials
            .get(handle)
            .map(|entry| entry.credential.info(handle))
            .ok_or_else(|| CredentialError::NotFound(format!("credential {}", handle)))
    }

    fn get_revocation_state(
        &self,
        rev_reg_id: &RevocationRegistryId,
        timestamp: u64,
    ) -> Result<RevocationState, CredentialError> {
        self.ensure_open()?;
        self.revocation_states
            .get(&(rev_reg_id.clone(), timestamp))
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                CredentialError::NotFound(format!(
                    "revocation state {} at {}",
                    rev_reg_id, timestamp
                ))
            })
    }

    fn get_master_secret(&self, id: &str) -> Result<MasterSecret, CredentialError> {
        self.ensure_open()?;
        self.master_secrets
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CredentialError::NotFound(format!("master secret {}", id)))
    }
}

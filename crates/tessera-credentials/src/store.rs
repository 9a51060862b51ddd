use tessera_core::{PredicateType, RevocationRegistryId};

use crate::credential::{Credential, CredentialInfo};
use crate::error::CredentialError;
use crate::master_secret::MasterSecret;
use crate::revocation::RevocationState;

/// Opaque reference to a stored credential (its referent).
pub type CredentialHandle = String;

/// Read interface the proof engine needs from a credential store.
///
/// Every method fails with `CredentialError::InvalidHandle` once the store has
/// been closed. Listing methods return handles in a deterministic order for
/// identical store contents.
pub trait CredentialStore: Send + Sync {
    /// Whether the store still accepts operations.
    fn is_open(&self) -> bool;

    /// Credentials carrying an attribute with this (normalized) name.
    fn find_credentials_by_attribute(
        &self,
        name: &str,
    ) -> Result<Vec<CredentialHandle>, CredentialError>;

    /// Credentials whose encoded value for `name` is numeric and satisfies
    /// `value <p_type> threshold`.
    fn find_credentials_by_predicate(
        &self,
        name: &str,
        p_type: PredicateType,
        threshold: i64,
    ) -> Result<Vec<CredentialHandle>, CredentialError>;

    fn get_credential(&self, handle: &str) -> Result<Credential, CredentialError>;

    fn get_credential_info(&self, handle: &str) -> Result<CredentialInfo, CredentialError>;

    /// Revocation state stored for `(registry, timestamp)`; `ItemNotFound` when absent.
    fn get_revocation_state(
        &self,
        rev_reg_id: &RevocationRegistryId,
        timestamp: u64,
    ) -> Result<RevocationState, CredentialError>;

    fn get_master_secret(&self, id: &str) -> Result<MasterSecret, CredentialError>;
}

//! Revocation registries, deltas and per-credential revocation states.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tessera_core::{CredentialDefinitionId, RevocationRegistryId};
use tessera_crypto::{Accumulator, CryptoError, Witness};

use crate::error::CredentialError;

/// How indices enter the issued set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuanceType {
    /// Every index is issued up front; issuing a credential leaves the
    /// accumulator unchanged.
    IssuanceByDefault,
    /// Indices are added to the accumulator as credentials are issued.
    #[default]
    IssuanceOnDemand,
}

/// Options for creating a revocation registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevocationRegistryConfig {
    /// Capacity; falls back to the issuer's configured default.
    #[serde(default)]
    pub max_cred_num: Option<u32>,
    #[serde(default)]
    pub issuance_type: IssuanceType,
}

/// Published definition of a revocation registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistryDefinition {
    pub id: RevocationRegistryId,
    #[serde(rename = "credDefId")]
    pub cred_def_id: CredentialDefinitionId,
    pub tag: String,
    pub max_cred_num: u32,
    pub issuance_type: IssuanceType,
}

impl RevocationRegistryDefinition {
    /// Whether `index` is within the registry's capacity (indices start at 1).
    pub fn contains_index(&self, index: u32) -> bool {
        index >= 1 && index <= self.max_cred_num
    }
}

/// Public accumulator value of a registry at some point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistry {
    pub accum: Accumulator,
}

/// Cumulative registry change set since creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistryDelta {
    pub accum: Accumulator,
    pub issued: BTreeSet<u32>,
    pub revoked: BTreeSet<u32>,
    /// Unix time at which the delta was produced.
    pub timestamp: u64,
}

impl RevocationRegistryDelta {
    pub(crate) fn from_sets(issued: &BTreeSet<u32>, revoked: &BTreeSet<u32>) -> Self {
        Self {
            accum: Accumulator::from_indices(issued),
            issued: issued.clone(),
            revoked: revoked.clone(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }

    /// Registry value described by this delta.
    pub fn registry(&self) -> RevocationRegistry {
        RevocationRegistry { accum: self.accum }
    }

    /// Fold a later delta into this one.
    pub fn merge(&mut self, later: &RevocationRegistryDelta) {
        for idx in &later.issued {
            self.revoked.remove(idx);
            self.issued.insert(*idx);
        }
        for idx in &later.revoked {
            self.issued.remove(idx);
            self.revoked.insert(*idx);
        }
        self.accum = later.accum;
        self.timestamp = later.timestamp.max(self.timestamp);
    }

    /// Whether the accumulator matches the issued set.
    pub fn is_consistent(&self) -> bool {
        Accumulator::from_indices(&self.issued) == self.accum
    }
}

/// Holder-side snapshot proving one credential was non-revoked at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationState {
    pub timestamp: u64,
    pub rev_reg: RevocationRegistry,
    pub witness: Witness,
    pub cred_rev_id: u32,
}

impl RevocationState {
    /// Build the state of `cred_rev_id` against `delta`.
    pub fn create(
        def: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        timestamp: u64,
        cred_rev_id: u32,
    ) -> Result<Self, CredentialError> {
        if !def.contains_index(cred_rev_id) {
            return Err(CredentialError::InvalidStructure(format!(
                "revocation index {} outside registry {} (max {})",
                cred_rev_id, def.id, def.max_cred_num
            )));
        }
        if !delta.is_consistent() {
            return Err(CredentialError::InvalidStructure(format!(
                "delta accumulator for {} does not match its issued set",
                def.id
            )));
        }

        let witness = Witness::create(&delta.issued, cred_rev_id).map_err(|e| match e {
            CryptoError::NotAMember(idx) => CredentialError::CredentialRevoked(idx),
            other => CredentialError::Crypto(other),
        })?;

        tracing::debug!(
            rev_reg_id = %def.id,
            cred_rev_id,
            timestamp,
            "revocation state created"
        );

        Ok(Self {
            timestamp,
            rev_reg: delta.registry(),
            witness,
            cred_rev_id,
        })
    }

    /// Rebuild this state against a newer delta.
    pub fn update(
        &self,
        def: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        timestamp: u64,
    ) -> Result<Self, CredentialError> {
        Self::create(def, delta, timestamp, self.cred_rev_id)
    }
}

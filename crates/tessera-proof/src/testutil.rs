//! Shared fixtures for unit tests: one issuer with a "gvt" schema and a
//! holder wallet.

use std::collections::{BTreeMap, HashMap};

use tessera_core::{RevocationRegistryId, Schema};
use tessera_credentials::{
    CredentialDefinition, CredentialDefinitionConfig, CredentialStore, Issuer,
    RevocationRegistryConfig, RevocationRegistryDefinition, RevocationState, Wallet,
};

use crate::builder::{
    CredentialDefsByCredential, RevocationStatesByCredential, SchemasByCredential,
};
use crate::verifier::{
    CredentialDefsById, RevocationRegistriesById, RevocationRegistryDefsById, SchemasById,
};

pub const ISSUER_DID: &str = "NcYxiDXkpYi6ov5FcYDi1e";
pub const TIMESTAMP: u64 = 1_700_000_000;

pub struct Fixture {
    pub issuer: Issuer,
    pub wallet: Wallet,
    pub master_secret_id: String,
    pub schema: Schema,
    pub cred_def: CredentialDefinition,
    pub rev_reg: Option<RevocationRegistryDefinition>,
}

pub fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn gvt(name: &str, age: &str) -> BTreeMap<String, String> {
    values(&[("name", name), ("age", age), ("sex", "male"), ("height", "175")])
}

impl Fixture {
    pub fn new(support_revocation: bool) -> Self {
        let issuer = Issuer::new(ISSUER_DID);
        let schema = issuer
            .create_schema("gvt", "1.0", &["name", "age", "sex", "height"])
            .unwrap();
        let cred_def = issuer
            .create_credential_definition(
                &schema,
                "TAG1",
                &CredentialDefinitionConfig { support_revocation },
            )
            .unwrap();
        let rev_reg = support_revocation.then(|| {
            issuer
                .create_revocation_registry(
                    &cred_def.id,
                    "R1",
                    &RevocationRegistryConfig {
                        max_cred_num: Some(5),
                        ..Default::default()
                    },
                )
                .unwrap()
                .0
        });
        let wallet = Wallet::new("holder");
        let master_secret_id = wallet.create_master_secret(Some("main")).unwrap();
        Self {
            issuer,
            wallet,
            master_secret_id,
            schema,
            cred_def,
            rev_reg,
        }
    }

    fn rev_reg_id(&self) -> Option<&RevocationRegistryId> {
        self.rev_reg.as_ref().map(|def| &def.id)
    }

    /// Issue a credential into the wallet under `cred_id`.
    pub fn issue(&self, cred_id: &str, raw: &BTreeMap<String, String>) -> String {
        let secret = self.wallet.get_master_secret(&self.master_secret_id).unwrap();
        let (credential, _, _) = self
            .issuer
            .issue_credential(&self.cred_def.id, &secret.commitment(), raw, self.rev_reg_id())
            .unwrap();
        self.wallet
            .store_credential(Some(cred_id), credential, &self.cred_def)
            .unwrap()
    }

    /// Revocation state for a stored credential against the registry's
    /// current delta.
    pub fn revocation_state(&self, cred_id: &str, timestamp: u64) -> RevocationState {
        let def = self.rev_reg.as_ref().unwrap();
        let delta = self.issuer.revocation_registry_delta(&def.id).unwrap();
        let credential = self.wallet.get_credential(cred_id).unwrap();
        RevocationState::create(def, &delta, timestamp, credential.cred_rev_id.unwrap()).unwrap()
    }

    pub fn prover_schemas(&self, cred_ids: &[&str]) -> SchemasByCredential {
        cred_ids
            .iter()
            .map(|id| (id.to_string(), self.schema.clone()))
            .collect()
    }

    pub fn prover_cred_defs(&self, cred_ids: &[&str]) -> CredentialDefsByCredential {
        cred_ids
            .iter()
            .map(|id| (id.to_string(), self.cred_def.clone()))
            .collect()
    }

    pub fn prover_rev_states(
        &self,
        cred_ids: &[&str],
        timestamp: u64,
    ) -> RevocationStatesByCredential {
        cred_ids
            .iter()
            .map(|id| {
                let mut by_ts = HashMap::new();
                by_ts.insert(timestamp, self.revocation_state(id, timestamp));
                (id.to_string(), by_ts)
            })
            .collect()
    }

    pub fn verifier_schemas(&self) -> SchemasById {
        HashMap::from([(self.schema.id.clone(), self.schema.clone())])
    }

    pub fn verifier_cred_defs(&self) -> CredentialDefsById {
        HashMap::from([(self.cred_def.id.clone(), self.cred_def.clone())])
    }

    pub fn verifier_rev_reg_defs(&self) -> RevocationRegistryDefsById {
        self.rev_reg
            .iter()
            .map(|def| (def.id.clone(), def.clone()))
            .collect()
    }

    /// Registry values at `timestamp`, taken from the current delta.
    pub fn verifier_rev_regs(&self, timestamp: u64) -> RevocationRegistriesById {
        self.rev_reg
            .iter()
            .map(|def| {
                let delta = self.issuer.revocation_registry_delta(&def.id).unwrap();
                (def.id.clone(), HashMap::from([(timestamp, delta.registry())]))
            })
            .collect()
    }
}

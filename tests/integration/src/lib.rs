//! Fixtures shared by the integration scenarios: issuers publishing a "gvt"
//! style schema, holders with a wallet behind a registry handle, and a ledger
//! collecting the public parameters a verifier needs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tessera_core::config::LoggingConfig;
use tessera_core::Schema;
use tessera_credentials::{
    CredentialDefinition, CredentialDefinitionConfig, CredentialStore, Issuer,
    RevocationRegistryConfig, RevocationRegistryDefinition, RevocationState, Wallet,
    WalletRegistry,
};
use tessera_proof::builder::{
    CredentialDefsByCredential, RevocationStatesByCredential, SchemasByCredential,
};
use tessera_proof::verifier::{
    CredentialDefsById, RevocationRegistriesById, RevocationRegistryDefsById, SchemasById,
};
use tracing_subscriber::EnvFilter;

pub const GVT_ATTRS: [&str; 4] = ["name", "age", "sex", "height"];

/// Install a subscriber for test output. Safe to call from every test.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer();
    let _ = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn gvt_values(name: &str, age: &str) -> BTreeMap<String, String> {
    values(&[("name", name), ("age", age), ("sex", "male"), ("height", "175")])
}

/// A holder's wallet opened through a registry.
pub struct Holder {
    pub handle: i32,
    pub wallet: Arc<Wallet>,
    pub master_secret_id: String,
}

impl Holder {
    pub fn open(registry: &WalletRegistry, owner: &str) -> Self {
        let handle = registry.open(owner);
        let wallet = registry.get(handle).expect("freshly opened handle");
        let master_secret_id = wallet
            .create_master_secret(None)
            .expect("master secret creation");
        Self {
            handle,
            wallet,
            master_secret_id,
        }
    }
}

/// An issuer with one schema, one credential definition and optionally a
/// revocation registry.
pub struct IssuerSetup {
    pub issuer: Issuer,
    pub schema: Schema,
    pub cred_def: CredentialDefinition,
    pub rev_reg: Option<RevocationRegistryDefinition>,
}

impl IssuerSetup {
    pub fn new(did: &str, schema_name: &str, support_revocation: bool) -> Self {
        let issuer = Issuer::new(did);
        let schema = issuer
            .create_schema(schema_name, "1.0", &GVT_ATTRS)
            .expect("schema creation");
        let cred_def = issuer
            .create_credential_definition(
                &schema,
                "TAG1",
                &CredentialDefinitionConfig { support_revocation },
            )
            .expect("credential definition creation");
        let rev_reg = support_revocation.then(|| {
            issuer
                .create_revocation_registry(
                    &cred_def.id,
                    "R1",
                    &RevocationRegistryConfig {
                        max_cred_num: Some(10),
                        ..Default::default()
                    },
                )
                .expect("registry creation")
                .0
        });
        Self {
            issuer,
            schema,
            cred_def,
            rev_reg,
        }
    }

    /// Issue a credential to `holder` and store it under `cred_id`.
    pub fn issue(&self, holder: &Holder, cred_id: &str, raw: &BTreeMap<String, String>) {
        let secret = holder
            .wallet
            .get_master_secret(&holder.master_secret_id)
            .expect("holder master secret");
        let (credential, _, _) = self
            .issuer
            .issue_credential(
                &self.cred_def.id,
                &secret.commitment(),
                raw,
                self.rev_reg.as_ref().map(|def| &def.id),
            )
            .expect("issuance");
        holder
            .wallet
            .store_credential(Some(cred_id), credential, &self.cred_def)
            .expect("store credential");
    }

    /// Holder-side revocation state for a stored credential against the
    /// registry as it stands now.
    pub fn revocation_state(
        &self,
        holder: &Holder,
        cred_id: &str,
        timestamp: u64,
    ) -> RevocationState {
        let def = self.rev_reg.as_ref().expect("revocable setup");
        let delta = self
            .issuer
            .revocation_registry_delta(&def.id)
            .expect("registry delta");
        let credential = holder
            .wallet
            .get_credential(cred_id)
            .expect("stored credential");
        RevocationState::create(
            def,
            &delta,
            timestamp,
            credential.cred_rev_id.expect("revocable credential"),
        )
        .expect("revocation state")
    }
}

/// Prover-side inputs keyed by credential id.
#[derive(Default)]
pub struct ProverMaps {
    pub schemas: SchemasByCredential,
    pub credential_defs: CredentialDefsByCredential,
    pub revocation_states: RevocationStatesByCredential,
}

impl ProverMaps {
    pub fn add(&mut self, cred_id: &str, setup: &IssuerSetup) -> &mut Self {
        self.schemas.insert(cred_id.to_string(), setup.schema.clone());
        self.credential_defs
            .insert(cred_id.to_string(), setup.cred_def.clone());
        self
    }

    pub fn add_state(&mut self, cred_id: &str, state: RevocationState) -> &mut Self {
        self.revocation_states
            .entry(cred_id.to_string())
            .or_default()
            .insert(state.timestamp, state);
        self
    }
}

/// Public parameters as a verifier would fetch them.
#[derive(Default)]
pub struct Ledger {
    pub schemas: SchemasById,
    pub credential_defs: CredentialDefsById,
    pub rev_reg_defs: RevocationRegistryDefsById,
    pub rev_regs: RevocationRegistriesById,
}

impl Ledger {
    /// Publish a setup's schema and definition, and its registry value at
    /// `timestamp` when it has one.
    pub fn publish(&mut self, setup: &IssuerSetup, timestamp: Option<u64>) -> &mut Self {
        self.schemas
            .insert(setup.schema.id.clone(), setup.schema.clone());
        self.credential_defs
            .insert(setup.cred_def.id.clone(), setup.cred_def.clone());
        if let (Some(def), Some(ts)) = (&setup.rev_reg, timestamp) {
            let delta = setup
                .issuer
                .revocation_registry_delta(&def.id)
                .expect("registry delta");
            self.rev_reg_defs.insert(def.id.clone(), def.clone());
            self.rev_regs
                .entry(def.id.clone())
                .or_insert_with(HashMap::new)
                .insert(ts, delta.registry());
        }
        self
    }
}

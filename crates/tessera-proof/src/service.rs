//! Async JSON boundary over the wallet registry.
//!
//! Every call is recorded in an in-flight table for as long as its future is
//! alive. The entry is removed on completion, on error and when the caller
//! drops the future.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tessera_core::EngineConfig;
use tessera_credentials::WalletRegistry;

use crate::builder::{
    CredentialDefsByCredential, ProofBuilder, ProverInputs, RevocationStatesByCredential,
    SchemasByCredential,
};
use crate::error::ProofError;
use crate::matcher;
use crate::proof::Proof;
use crate::request::ProofRequest;
use crate::selection::RequestedCredentials;
use crate::verifier::{
    self, CredentialDefsById, RevocationRegistriesById, RevocationRegistryDefsById, SchemasById,
};

/// Operation names recorded in the in-flight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ResolveCandidates,
    BuildProof,
    VerifyProof,
}

#[derive(Debug, Clone)]
pub struct InFlightCommand {
    pub operation: Operation,
    pub wallet_handle: Option<i32>,
    pub started_at: DateTime<Utc>,
}

/// Removes its command from the table when dropped.
struct CommandGuard {
    id: u64,
    table: Arc<DashMap<u64, InFlightCommand>>,
}

impl Drop for CommandGuard {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}

/// Prover and verifier operations addressed by wallet handle, taking and
/// returning JSON.
pub struct ProverService {
    wallets: Arc<WalletRegistry>,
    config: EngineConfig,
    in_flight: Arc<DashMap<u64, InFlightCommand>>,
    next_command: AtomicU64,
}

impl ProverService {
    pub fn new(wallets: Arc<WalletRegistry>, config: EngineConfig) -> Self {
        Self {
            wallets,
            config,
            in_flight: Arc::new(DashMap::new()),
            next_command: AtomicU64::new(1),
        }
    }

    pub fn wallets(&self) -> &Arc<WalletRegistry> {
        &self.wallets
    }

    /// Number of calls currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn register(&self, operation: Operation, wallet_handle: Option<i32>) -> CommandGuard {
        let id = self.next_command.fetch_add(1, Ordering::SeqCst);
        self.in_flight.insert(
            id,
            InFlightCommand {
                operation,
                wallet_handle,
                started_at: Utc::now(),
            },
        );
        tracing::trace!(command = id, ?operation, "command registered");
        CommandGuard {
            id,
            table: Arc::clone(&self.in_flight),
        }
    }

    /// Candidates for every referent of the request, as JSON.
    pub async fn resolve_candidates(
        &self,
        wallet_handle: i32,
        proof_request_json: &str,
    ) -> Result<String, ProofError> {
        let _guard = self.register(Operation::ResolveCandidates, Some(wallet_handle));
        let wallet = self.wallets.get(wallet_handle)?;
        let request = ProofRequest::from_json(proof_request_json)?;
        let config = self.config.matcher.clone();

        run_blocking(move || {
            let candidates = matcher::resolve_candidates(wallet.as_ref(), &request, &config)?;
            Ok(serde_json::to_string(&candidates)?)
        })
        .await
    }

    /// Build a proof from a selection, returning the proof JSON.
    #[allow(clippy::too_many_arguments)]
    pub async fn build_proof(
        &self,
        wallet_handle: i32,
        proof_request_json: &str,
        requested_credentials_json: &str,
        master_secret_id: &str,
        schemas_json: &str,
        credential_defs_json: &str,
        revocation_states_json: &str,
    ) -> Result<String, ProofError> {
        let _guard = self.register(Operation::BuildProof, Some(wallet_handle));
        let wallet = self.wallets.get(wallet_handle)?;
        let request = ProofRequest::from_json(proof_request_json)?;
        let requested = RequestedCredentials::from_json(requested_credentials_json)?;
        let schemas: SchemasByCredential = parse("schemas", schemas_json)?;
        let credential_defs: CredentialDefsByCredential =
            parse("credential definitions", credential_defs_json)?;
        let revocation_states: RevocationStatesByCredential =
            parse("revocation states", revocation_states_json)?;
        let builder = ProofBuilder::from_config(&self.config);
        let master_secret_id = master_secret_id.to_string();

        run_blocking(move || {
            let inputs = ProverInputs {
                schemas: &schemas,
                credential_defs: &credential_defs,
                revocation_states: &revocation_states,
            };
            let proof = builder.build(
                wallet.as_ref(),
                &request,
                &requested,
                &master_secret_id,
                &inputs,
            )?;
            Ok(serde_json::to_string(&proof)?)
        })
        .await
    }

    /// Verify a proof against public parameters.
    pub async fn verify_proof(
        &self,
        proof_request_json: &str,
        proof_json: &str,
        schemas_json: &str,
        credential_defs_json: &str,
        revocation_registry_defs_json: &str,
        revocation_registries_json: &str,
    ) -> Result<bool, ProofError> {
        let _guard = self.register(Operation::VerifyProof, None);
        let request = ProofRequest::from_json(proof_request_json)?;
        let proof = Proof::from_json(proof_json)?;
        let schemas: SchemasById = parse("schemas", schemas_json)?;
        let credential_defs: CredentialDefsById =
            parse("credential definitions", credential_defs_json)?;
        let rev_reg_defs: RevocationRegistryDefsById =
            parse("revocation registry definitions", revocation_registry_defs_json)?;
        let rev_regs: RevocationRegistriesById =
            parse("revocation registries", revocation_registries_json)?;

        run_blocking(move || {
            verifier::verify_proof(
                &request,
                &proof,
                &schemas,
                &credential_defs,
                &rev_reg_defs,
                &rev_regs,
            )
        })
        .await
    }
}

/// Empty input means an empty map.
fn parse<T>(what: &str, json: &str) -> Result<T, ProofError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(json)
        .map_err(|e| ProofError::InvalidStructure(format!("malformed {}: {}", what, e)))
}

async fn run_blocking<T, F>(f: F) -> Result<T, ProofError>
where
    F: FnOnce() -> Result<T, ProofError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProofError::Internal(format!("proof task failed: {}", e)))?
}

//! Integration test: the async JSON boundary.
//!
//! Drives resolve/build/verify through `ProverService` the way an agent layer
//! would, including many concurrent flows over the same wallet.

use std::sync::Arc;

use futures::future::join_all;
use tessera_core::config::LoggingConfig;
use tessera_core::{EngineConfig, ErrorKind};
use tessera_credentials::WalletRegistry;
use tessera_integration_tests::{gvt_values, init_tracing, Holder, IssuerSetup, Ledger, ProverMaps};
use tessera_proof::{CredentialsForProofRequest, ProverService};

const ISSUER: &str = "NcYxiDXkpYi6ov5FcYDi1e";

fn request_json(nonce: u32) -> String {
    format!(
        r#"{{"nonce": "{}", "name": "proof_req_1", "version": "0.1",
            "requested_attributes": {{"attr1_referent": {{"name": "name"}}}},
            "requested_predicates": {{
                "predicate1_referent": {{"name": "age", "p_type": ">=", "p_value": 18}}
            }}}}"#,
        nonce
    )
}

const REQUESTED: &str = r#"{
    "requested_attributes": {"attr1_referent": {"cred_id": "cred-alex", "revealed": true}},
    "requested_predicates": {"predicate1_referent": {"cred_id": "cred-alex"}}
}"#;

struct World {
    service: Arc<ProverService>,
    holder: Holder,
    prover_schemas: String,
    prover_defs: String,
    ledger_schemas: String,
    ledger_defs: String,
}

fn world() -> World {
    let config = EngineConfig::default();
    init_tracing(&LoggingConfig {
        format: "json".into(),
        ..config.logging.clone()
    });
    let registry = Arc::new(WalletRegistry::new());
    let holder = Holder::open(&registry, "prover");
    let gvt = IssuerSetup::new(ISSUER, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));

    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);

    World {
        service: Arc::new(ProverService::new(registry, config)),
        holder,
        prover_schemas: serde_json::to_string(&maps.schemas).unwrap(),
        prover_defs: serde_json::to_string(&maps.credential_defs).unwrap(),
        ledger_schemas: serde_json::to_string(&ledger.schemas).unwrap(),
        ledger_defs: serde_json::to_string(&ledger.credential_defs).unwrap(),
    }
}

async fn round_trip(world: &World, nonce: u32) -> bool {
    let request = request_json(nonce);
    let candidates_json = world
        .service
        .resolve_candidates(world.holder.handle, &request)
        .await
        .unwrap();
    let candidates: CredentialsForProofRequest = serde_json::from_str(&candidates_json).unwrap();
    assert_eq!(candidates.attrs["attr1_referent"].len(), 1);
    assert_eq!(candidates.predicates["predicate1_referent"].len(), 1);

    let proof_json = world
        .service
        .build_proof(
            world.holder.handle,
            &request,
            REQUESTED,
            &world.holder.master_secret_id,
            &world.prover_schemas,
            &world.prover_defs,
            "{}",
        )
        .await
        .unwrap();
    let proof: serde_json::Value = serde_json::from_str(&proof_json).unwrap();
    assert_eq!(
        proof["requested_proof"]["revealed_attrs"]["attr1_referent"]["raw"],
        "Alex"
    );

    world
        .service
        .verify_proof(
            &request,
            &proof_json,
            &world.ledger_schemas,
            &world.ledger_defs,
            "{}",
            "{}",
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_json_round_trip() {
    let world = world();
    assert!(round_trip(&world, 1).await);
    assert_eq!(world.service.in_flight_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_flows_share_a_wallet() {
    let world = world();
    let results = join_all((0..16).map(|nonce| round_trip(&world, nonce + 100))).await;
    assert!(results.into_iter().all(|ok| ok));
    assert_eq!(world.service.in_flight_count(), 0);
}

#[tokio::test]
async fn test_proof_for_other_nonce_rejected() {
    let world = world();
    let proof_json = world
        .service
        .build_proof(
            world.holder.handle,
            &request_json(1),
            REQUESTED,
            &world.holder.master_secret_id,
            &world.prover_schemas,
            &world.prover_defs,
            "",
        )
        .await
        .unwrap();
    let ok = world
        .service
        .verify_proof(
            &request_json(2),
            &proof_json,
            &world.ledger_schemas,
            &world.ledger_defs,
            "",
            "",
        )
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_closed_handle_and_bad_json() {
    let world = world();

    let err = world
        .service
        .build_proof(
            world.holder.handle,
            &request_json(1),
            REQUESTED,
            &world.holder.master_secret_id,
            "not json",
            &world.prover_defs,
            "{}",
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);

    world.service.wallets().close(world.holder.handle).unwrap();
    let err = world
        .service
        .resolve_candidates(world.holder.handle, &request_json(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    assert_eq!(world.service.in_flight_count(), 0);
}

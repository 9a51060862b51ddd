//! Integration test: matcher → selection → builder → verifier across crates.
//!
//! Scenarios follow a holder with credentials from one or more issuers
//! answering proof requests from a verifier who only sees public parameters.

use tessera_core::config::{LoggingConfig, MatcherConfig};
use tessera_core::ErrorKind;
use tessera_credentials::WalletRegistry;
use tessera_integration_tests::{
    gvt_values, init_tracing, Holder, IssuerSetup, Ledger, ProverMaps,
};
use tessera_proof::{
    build_proof, generate_nonce, resolve_candidates, verify_proof, Proof, ProofRequest,
    RequestedCredentials,
};

const ISSUER_A: &str = "NcYxiDXkpYi6ov5FcYDi1e";
const ISSUER_B: &str = "VsKV7grR1BUE29mG2Fm2kX";

fn setup() -> (WalletRegistry, Holder) {
    init_tracing(&LoggingConfig::default());
    let registry = WalletRegistry::new();
    let holder = Holder::open(&registry, "prover");
    (registry, holder)
}

fn build(
    holder: &Holder,
    request: &ProofRequest,
    requested: &RequestedCredentials,
    maps: &ProverMaps,
) -> Result<Proof, tessera_proof::ProofError> {
    build_proof(
        holder.wallet.as_ref(),
        request,
        requested,
        &holder.master_secret_id,
        &maps.schemas,
        &maps.credential_defs,
        &maps.revocation_states,
    )
}

fn verify(request: &ProofRequest, proof: &Proof, ledger: &Ledger) -> bool {
    verify_proof(
        request,
        proof,
        &ledger.schemas,
        &ledger.credential_defs,
        &ledger.rev_reg_defs,
        &ledger.rev_regs,
    )
    .expect("all public parameters supplied")
}

// =========================================================================
// Revealed attributes and predicates
// =========================================================================

#[test]
fn test_revealed_attribute_round_trip() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));

    let request = ProofRequest::from_json(&format!(
        r#"{{"nonce": "{}", "name": "proof_req_1", "version": "0.1",
            "requested_attributes": {{"attr1_referent": {{"name": "name"}}}}}}"#,
        generate_nonce()
    ))
    .unwrap();

    let candidates =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert_eq!(candidates.attrs["attr1_referent"].len(), 1);
    let cred_id = candidates.attrs["attr1_referent"][0].cred_info.referent.clone();
    assert_eq!(cred_id, "cred-alex");

    let requested = RequestedCredentials::from_json(&format!(
        r#"{{"requested_attributes": {{"attr1_referent": {{"cred_id": "{}", "revealed": true}}}}}}"#,
        cred_id
    ))
    .unwrap();
    requested.validate_against(&request, &candidates).unwrap();

    let mut maps = ProverMaps::default();
    maps.add(&cred_id, &gvt);
    let proof = build(&holder, &request, &requested, &maps).unwrap();
    assert_eq!(
        proof.requested_proof.revealed_attrs["attr1_referent"].raw,
        "Alex"
    );

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);
    assert!(verify(&request, &proof, &ledger));
}

#[test]
fn test_predicate_with_legacy_field_names() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));

    let request = ProofRequest::from_json(
        r#"{"nonce": "123432421212", "name": "proof_req_1", "version": "0.1",
            "requested_predicates": {
                "predicate1_referent": {"attr_name": "age", "op": ">=", "value": 18}
            }}"#,
    )
    .unwrap();

    let candidates =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert_eq!(candidates.predicates["predicate1_referent"].len(), 1);

    let requested = RequestedCredentials::from_json(
        r#"{"requested_predicates": {"predicate1_referent": {"cred_id": "cred-alex"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    let proof = build(&holder, &request, &requested, &maps).unwrap();

    // The value itself never appears in the proof.
    let json = serde_json::to_string(&proof).unwrap();
    assert!(!json.contains("\"28\""));

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);
    assert!(verify(&request, &proof, &ledger));
}

#[test]
fn test_unsatisfiable_predicate() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-kid", &gvt_values("Kid", "10"));

    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "proof_req_1", "version": "0.1",
            "requested_predicates": {
                "predicate1_referent": {"attr_name": "age", "op": ">=", "value": 18}
            }}"#,
    )
    .unwrap();
    let candidates =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert!(candidates.predicates["predicate1_referent"].is_empty());

    // Nothing to select: an empty selection is incomplete.
    let empty = RequestedCredentials::default();
    let mut maps = ProverMaps::default();
    maps.add("cred-kid", &gvt);
    let err = build(&holder, &request, &empty, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);

    // Forcing the ineligible credential fails before any proof is produced.
    let forced = RequestedCredentials::from_json(
        r#"{"requested_predicates": {"predicate1_referent": {"cred_id": "cred-kid"}}}"#,
    )
    .unwrap();
    assert!(forced.validate_against(&request, &candidates).is_err());
    let err = build(&holder, &request, &forced, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
}

#[test]
fn test_mixed_proof_across_two_issuers() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    let xyz = IssuerSetup::new(ISSUER_B, "xyz", false);
    gvt.issue(&holder, "cred-gvt", &gvt_values("Alex", "28"));
    xyz.issue(&holder, "cred-xyz", &gvt_values("Alex", "31"));

    let request = ProofRequest::from_json(&format!(
        r#"{{"nonce": "42", "name": "mixed", "version": "1.0",
            "requested_attributes": {{
                "attr1_referent": {{"name": "name", "restrictions": {{"issuer_did": "{a}"}}}},
                "attr2_referent": {{"name": "sex"}},
                "attr3_referent": {{"name": "phone"}}
            }},
            "requested_predicates": {{
                "predicate1_referent": {{"name": "age", "p_type": ">", "p_value": 30,
                    "restrictions": [{{"issuer_did": "{b}"}}]}}
            }}}}"#,
        a = ISSUER_A,
        b = ISSUER_B
    ))
    .unwrap();

    let candidates =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert_eq!(candidates.attrs["attr1_referent"].len(), 1);
    assert_eq!(candidates.attrs["attr2_referent"].len(), 2);
    assert!(candidates.attrs["attr3_referent"].is_empty());
    assert_eq!(
        candidates.predicates["predicate1_referent"][0].cred_info.referent,
        "cred-xyz"
    );

    let requested = RequestedCredentials::from_json(
        r#"{"self_attested_attributes": {"attr3_referent": "8-800-300"},
            "requested_attributes": {
                "attr1_referent": {"cred_id": "cred-gvt", "revealed": true},
                "attr2_referent": {"cred_id": "cred-xyz", "revealed": false}
            },
            "requested_predicates": {"predicate1_referent": {"cred_id": "cred-xyz"}}}"#,
    )
    .unwrap();
    requested.validate_against(&request, &candidates).unwrap();

    let mut maps = ProverMaps::default();
    maps.add("cred-gvt", &gvt).add("cred-xyz", &xyz);
    let proof = build(&holder, &request, &requested, &maps).unwrap();
    assert_eq!(proof.proof.proofs.len(), 2);
    assert_eq!(
        proof.requested_proof.self_attested_attrs["attr3_referent"],
        "8-800-300"
    );

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None).publish(&xyz, None);
    assert!(verify(&request, &proof, &ledger));
}

// =========================================================================
// Restrictions
// =========================================================================

#[test]
fn test_restriction_disjunction_and_conjunction() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    let xyz = IssuerSetup::new(ISSUER_B, "xyz", false);
    gvt.issue(&holder, "cred-gvt", &gvt_values("Alex", "28"));
    xyz.issue(&holder, "cred-xyz", &gvt_values("Alex", "31"));

    let request = ProofRequest::from_json(&format!(
        r#"{{"nonce": "7", "name": "r", "version": "1",
            "requested_attributes": {{
                "either": {{"name": "name", "restrictions": [
                    {{"schema_id": "{gvt_schema}"}}, {{"cred_def_id": "{xyz_def}"}}
                ]}},
                "both": {{"name": "name", "restrictions": [
                    {{"issuer_did": "{a}", "schema_name": "gvt", "schema_version": "1.0"}}
                ]}},
                "contradiction": {{"name": "name", "restrictions": [
                    {{"issuer_did": "{a}", "schema_name": "xyz"}}
                ]}}
            }}}}"#,
        gvt_schema = gvt.schema.id,
        xyz_def = xyz.cred_def.id,
        a = ISSUER_A
    ))
    .unwrap();

    let candidates =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    let ids = |referent: &str| -> Vec<String> {
        candidates.attrs[referent]
            .iter()
            .map(|c| c.cred_info.referent.clone())
            .collect()
    };
    assert_eq!(ids("either"), vec!["cred-gvt", "cred-xyz"]);
    assert_eq!(ids("both"), vec!["cred-gvt"]);
    assert!(ids("contradiction").is_empty());
}

#[test]
fn test_restricted_referent_from_wrong_issuer_is_rejected() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-gvt", &gvt_values("Alex", "28"));

    let open = ProofRequest::from_json(
        r#"{"nonce": "5", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "cred-gvt"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-gvt", &gvt);
    let proof = build(&holder, &open, &requested, &maps).unwrap();

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);
    assert!(verify(&open, &proof, &ledger));

    // Same nonce, but the verifier only accepts another issuer.
    let strict = ProofRequest::from_json(&format!(
        r#"{{"nonce": "5", "name": "r", "version": "1",
            "requested_attributes": {{"attr1_referent": {{"name": "name",
                "restrictions": [{{"issuer_did": "{}"}}]}}}}}}"#,
        ISSUER_B
    ))
    .unwrap();
    assert!(!verify(&strict, &proof, &ledger));

    // The builder refuses the same selection up front.
    let err = build(&holder, &strict, &requested, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
}

#[test]
fn test_restricted_attribute_cannot_be_self_attested() {
    let (_registry, holder) = setup();
    let request = ProofRequest::from_json(&format!(
        r#"{{"nonce": "5", "name": "r", "version": "1",
            "requested_attributes": {{"attr1_referent": {{"name": "name",
                "restrictions": {{"issuer_did": "{}"}}}}}}}}"#,
        ISSUER_A
    ))
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"self_attested_attributes": {"attr1_referent": "Alex"}}"#,
    )
    .unwrap();
    let err = build(&holder, &request, &requested, &ProverMaps::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
}

// =========================================================================
// Matcher properties
// =========================================================================

#[test]
fn test_unrestricted_matching_ignores_issuer() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    let xyz = IssuerSetup::new(ISSUER_B, "xyz", false);
    gvt.issue(&holder, "c1", &gvt_values("Alex", "28"));
    xyz.issue(&holder, "c2", &gvt_values("Sam", "33"));
    gvt.issue(&holder, "c3", &gvt_values("Kim", "19"));

    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "r", "version": "1",
            "requested_attributes": {"a": {"name": "height"}}}"#,
    )
    .unwrap();
    let first =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert_eq!(first.attrs["a"].len(), 3);

    let second =
        resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default()).unwrap();
    assert_eq!(first, second);
}

// =========================================================================
// Failure kinds
// =========================================================================

#[test]
fn test_missing_schema_entry() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));

    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "cred-alex"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    maps.schemas.clear();

    let err = build(&holder, &request, &requested, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
}

#[test]
fn test_unknown_credential_id() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "nobody"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("nobody", &gvt);

    let err = build(&holder, &request, &requested, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ItemNotFound);
}

#[test]
fn test_closed_handle_everywhere() {
    let (registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));
    registry.close(holder.handle).unwrap();

    assert_eq!(
        registry.get(holder.handle).unwrap_err().kind(),
        ErrorKind::InvalidHandle
    );

    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let err = resolve_candidates(holder.wallet.as_ref(), &request, &MatcherConfig::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);

    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "cred-alex"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    let err = build(&holder, &request, &requested, &maps).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
}

#[test]
fn test_verifier_missing_definition_is_error() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));
    let request = ProofRequest::from_json(
        r#"{"nonce": "1", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "cred-alex"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    let proof = build(&holder, &request, &requested, &maps).unwrap();

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);
    ledger.credential_defs.clear();
    let err = verify_proof(
        &request,
        &proof,
        &ledger.schemas,
        &ledger.credential_defs,
        &ledger.rev_reg_defs,
        &ledger.rev_regs,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
}

// =========================================================================
// Tampering
// =========================================================================

#[test]
fn test_forged_opening_rejected() {
    let (_registry, holder) = setup();
    let gvt = IssuerSetup::new(ISSUER_A, "gvt", false);
    gvt.issue(&holder, "cred-alex", &gvt_values("Alex", "28"));

    let request = ProofRequest::from_json(
        r#"{"nonce": "77", "name": "r", "version": "1",
            "requested_attributes": {"attr1_referent": {"name": "name"}}}"#,
    )
    .unwrap();
    let requested = RequestedCredentials::from_json(
        r#"{"requested_attributes": {"attr1_referent": {"cred_id": "cred-alex"}}}"#,
    )
    .unwrap();
    let mut maps = ProverMaps::default();
    maps.add("cred-alex", &gvt);
    let proof = build(&holder, &request, &requested, &maps).unwrap();

    let mut ledger = Ledger::default();
    ledger.publish(&gvt, None);
    assert!(verify(&request, &proof, &ledger));

    // Claim a different name with a fresh blinding factor.
    let mut forged = proof.clone();
    let encoded = tessera_core::encode_attribute_value("Mallory");
    let revealed = forged
        .requested_proof
        .revealed_attrs
        .get_mut("attr1_referent")
        .unwrap();
    revealed.raw = "Mallory".into();
    revealed.encoded = encoded.clone();
    let opening = forged.proof.proofs[0]
        .primary
        .revealed
        .get_mut("name")
        .unwrap();
    opening.encoded = encoded;
    opening.blinding = tessera_crypto::Blinding::random();
    assert!(!verify(&request, &forged, &ledger));

    // Altering a signed field breaks the issuer check.
    let mut resigned = proof.clone();
    resigned.proof.proofs[0].primary.cred_rev_id = Some(1);
    assert!(!verify(&request, &resigned, &ledger));
}

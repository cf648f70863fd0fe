//! Contract render integration tests
//!
//! Exercise `ContractService::preview_contract` end to end over in-memory
//! repositories and blob stores.

mod helpers;

use helpers::{standard_fees, Harness};
use ime_contracts::types::{FeeStructure, FeeVariable, FieldValues, Namespace, Scalar};
use ime_contracts::{
    BlobStore, ContractError, ContractService, ContractStores, ContractsConfig,
    InMemoryContractStore, InMemoryVariableStore, LocalBlobStore, RecordKind, EMPTY_TEMPLATE_HTML,
};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn dr_smith() -> FieldValues {
    FieldValues::new().with_value(Namespace::Examiner, "name", "Dr. Smith")
}

#[tokio::test]
async fn test_render_scenario() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let contract = harness
        .contract(
            "Fee: {{fees.ime_fee}}. Examiner: {{examiner.name}}. Missing: {{contract.nonexistent}}",
            standard_fees(),
            dr_smith(),
        )
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();

    assert_eq!(
        outcome.rendered_html,
        "Fee: $200.00. Examiner: Dr. Smith. Missing: {{contract.nonexistent}}"
    );
    assert_eq!(outcome.missing_placeholders, vec!["contract.nonexistent"]);

    let key = outcome.snapshot_key.expect("snapshot key");
    assert!(key.starts_with(&format!("contracts/{}/unsigned-", contract.id)));
    assert!(key.ends_with(".html"));

    let blob = harness.blobs.get(&format!("memory://{}", key)).await.unwrap();
    assert_eq!(blob.content, outcome.rendered_html.as_bytes());
    assert_eq!(blob.content_type, "text/html; charset=utf-8");

    let stored = harness.stored_contract(contract.id).await;
    assert_eq!(stored.data.rendered_html.as_deref(), Some(outcome.rendered_html.as_str()));
    assert_eq!(stored.data.unsigned_html_key.as_deref(), Some(key.as_str()));
    assert!(stored.data.last_rendered_at.is_some());
}

#[tokio::test]
async fn test_repeated_renders_are_identical_with_distinct_keys() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let contract = harness
        .contract("{{examiner.name}} charges {{fees.ime_fee}}", standard_fees(), dr_smith())
        .await;

    let first = harness.service.preview_contract(contract.id).await.unwrap();
    let second = harness.service.preview_contract(contract.id).await.unwrap();

    assert_eq!(first.rendered_html, second.rendered_html);
    assert_eq!(first.missing_placeholders, second.missing_placeholders);
    assert_ne!(first.snapshot_key, second.snapshot_key);
    assert_eq!(harness.blobs.len().await, 2);

    let stored = harness.stored_contract(contract.id).await;
    assert_eq!(stored.data.unsigned_html_key, second.snapshot_key);
}

#[tokio::test]
async fn test_fee_override_beats_default() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let field_values = dr_smith().with_value(Namespace::FeesOverrides, "ime_fee", 1750_i64);
    let contract = harness
        .contract("{{fees.ime_fee}}", standard_fees(), field_values)
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(outcome.rendered_html, "$1,750.00");
}

#[tokio::test]
async fn test_money_and_number_formatting() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let fees = FeeStructure::new(
        "Formatting",
        vec![
            FeeVariable::money("ime_fee", "IME Fee", Scalar::Integer(150)),
            FeeVariable::money("flat_fee", "Flat Fee", Scalar::Integer(150)).with_decimals(0),
            FeeVariable::money("no_show_fee", "No-Show", Scalar::Float(99.5)).with_currency("CAD"),
            FeeVariable::number("turnaround", "Turnaround", Scalar::from("10")),
        ],
    );
    let contract = harness
        .contract(
            "{{fees.ime_fee}}|{{fees.flat_fee}}|{{fees.no_show_fee}}|{{fees.turnaround}}",
            fees,
            FieldValues::new(),
        )
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(outcome.rendered_html, "$150.00|$150|CA$99.50|10");
}

#[tokio::test]
async fn test_globals_and_organization_values() {
    let variables = InMemoryVariableStore::new()
        .with_system("thrive.company_name", "Thrive")
        .with_system("thrive.phone", "1-800-555-0100")
        .with_custom("system.support_email", "support@example.com");
    let harness = Harness::new(variables);

    let field_values =
        FieldValues::new().with_value(Namespace::Thrive, "company_name", "Thrive West");
    let contract = harness
        .contract(
            "{{thrive.company_name}} / {{thrive.phone}} / {{system.support_email}}",
            standard_fees(),
            field_values,
        )
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(
        outcome.rendered_html,
        "Thrive West / 1-800-555-0100 / support@example.com"
    );
}

#[tokio::test]
async fn test_legacy_org_namespace_renders_under_thrive() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let field_values = FieldValues::new().with_value(Namespace::Org, "company_name", "Legacy Org");
    let contract = harness
        .contract("{{thrive.company_name}}", standard_fees(), field_values)
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(outcome.rendered_html, "Legacy Org");
    assert!(outcome.missing_placeholders.is_empty());
}

#[tokio::test]
async fn test_logo_markup_ignores_inner_whitespace() {
    let variables =
        InMemoryVariableStore::new().with_system("thrive.logo", "https://cdn.example.com/logo.png");
    let harness = Harness::new(variables);
    let contract = harness
        .contract("{{thrive.logo}}|{{ thrive.logo }}", standard_fees(), FieldValues::new())
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    let parts: Vec<&str> = outcome.rendered_html.split('|').collect();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], parts[1]);
    assert!(parts[0].contains(r#"<img src="https://cdn.example.com/logo.png" alt="Logo""#));
}

#[tokio::test]
async fn test_optional_signature_placeholders_collapse() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let contract = harness
        .contract(
            concat!(
                "Sig: {{examiner.signature}} on {{examiner.signature_date_time}}; ",
                "{{examiner.middle_name}}",
            ),
            standard_fees(),
            dr_smith(),
        )
        .await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(outcome.rendered_html, "Sig:  on ; {{examiner.middle_name}}");
    assert_eq!(outcome.missing_placeholders, vec!["examiner.middle_name"]);
}

#[tokio::test]
async fn test_blank_template_short_circuits() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let contract = harness.contract("  \n\t ", standard_fees(), dr_smith()).await;

    let outcome = harness.service.preview_contract(contract.id).await.unwrap();
    assert_eq!(outcome.rendered_html, EMPTY_TEMPLATE_HTML);
    assert!(outcome.missing_placeholders.is_empty());
    assert!(outcome.snapshot_key.is_none());
    assert!(harness.blobs.is_empty().await);

    let stored = harness.stored_contract(contract.id).await;
    assert!(stored.data.rendered_html.is_none());
}

#[tokio::test]
async fn test_unknown_contract_is_not_found() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let id = Uuid::now_v7();

    let err = harness.service.preview_contract(id).await.unwrap_err();
    assert!(matches!(
        err,
        ContractError::NotFound { kind: RecordKind::Contract, id: missing } if missing == id
    ));
}

#[tokio::test]
async fn test_storage_failure_leaves_contract_unchanged() {
    let harness = Harness::with_failing_storage();
    let contract = harness
        .contract("Fee: {{fees.ime_fee}}", standard_fees(), dr_smith())
        .await;

    let err = harness.service.preview_contract(contract.id).await.unwrap_err();
    assert!(matches!(err, ContractError::StorageFailure(_)));

    let stored = harness.stored_contract(contract.id).await;
    assert_eq!(stored.data, contract.data);
    assert!(stored.data.unsigned_html_key.is_none());
}

#[tokio::test]
async fn test_render_rejects_incompatible_fee_structure() {
    let harness = Harness::new(InMemoryVariableStore::new());
    let contract = harness
        .contract("Fee: {{fees.ime_fee}}", standard_fees(), dr_smith())
        .await;

    // The stored fee structure lost its variable after the contract was created
    let mut shrunk = standard_fees();
    shrunk.id = contract.fee_structure_id;
    shrunk.variables.clear();
    harness.store.insert_fee_structure(shrunk).await;

    let err = harness.service.preview_contract(contract.id).await.unwrap_err();
    assert_eq!(err.missing_variables(), Some(&["ime_fee".to_string()][..]));
    assert!(harness.blobs.is_empty().await);
}

#[tokio::test]
async fn test_local_blob_store_receives_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let store = InMemoryContractStore::new();
    let blob_store = Arc::new(LocalBlobStore::new(temp_dir.path()));
    let config = ContractsConfig {
        blob_root: temp_dir.path().to_path_buf(),
        snapshot_prefix: "snapshots".to_string(),
        ..Default::default()
    };
    let service = ContractService::new(
        ContractStores::in_memory(store.clone(), InMemoryVariableStore::new()),
        blob_store.clone(),
        &config,
    );

    let template =
        ime_contracts::types::TemplateVersion::new(Uuid::now_v7(), 1, "{{fees.ime_fee}}");
    let fees = standard_fees();
    let (template_version_id, fee_structure_id) = (template.id, fees.id);
    store.insert_template_version(template).await;
    store.insert_fee_structure(fees).await;

    let contract = service
        .create_contract(ime_contracts::types::NewContract {
            template_version_id,
            fee_structure_id,
            field_values: FieldValues::new(),
        })
        .await
        .unwrap();
    let outcome = service.preview_contract(contract.id).await.unwrap();

    let key = outcome.snapshot_key.unwrap();
    assert!(key.starts_with("snapshots/"));
    let path = temp_dir.path().join(&key);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "$200.00");
    assert!(blob_store
        .exists(&format!("file://{}", path.display()))
        .await
        .unwrap());
}

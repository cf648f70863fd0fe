//! Contract Service
//!
//! Orchestrates the rendering core over the repository traits and a blob
//! store: create, update, re-point fee structure, sign, preview (render and
//! snapshot), and the examiner fee view. Every check that can reject a
//! request runs before the first write.

use chrono::Utc;
use ime_templates::compatibility::check_unique_keys;
use ime_templates::fee_roles::summarize;
use ime_templates::scanner::unknown_namespaces;
use ime_templates::{
    extract_required_fee_variables, render, scan, validate_template, CompatibilityReport,
    FeeSummary, VariableResolver,
};
use ime_types::{
    Contract, FeeStructure, FieldValues, NewContract, Scalar, ScalarMap, TemplateVersion,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::blob_store::BlobStore;
use crate::config::ContractsConfig;
use crate::database::{
    ContractRepository, FeeStructureRepository, InMemoryContractStore, InMemoryVariableStore,
    RenderSnapshot, TemplateRepository, VariableStore,
};
use crate::error::{ContractError, ContractResult, RecordKind};

/// Returned in place of a document when the template body is blank
pub const EMPTY_TEMPLATE_HTML: &str =
    "<p>This contract template has no content yet. Add content to the template to preview it.</p>";

pub const SNAPSHOT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Disambiguates snapshot keys rendered within the same millisecond
static SNAPSHOT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Data access handles the service reads and writes through
#[derive(Clone)]
pub struct ContractStores {
    pub contracts: Arc<dyn ContractRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub fee_structures: Arc<dyn FeeStructureRepository>,
    pub variables: Arc<dyn VariableStore>,
}

impl ContractStores {
    /// One in-memory store serving contracts, templates and fee structures
    pub fn in_memory(store: InMemoryContractStore, variables: InMemoryVariableStore) -> Self {
        let store = Arc::new(store);
        Self {
            contracts: store.clone(),
            templates: store.clone(),
            fee_structures: store,
            variables: Arc::new(variables),
        }
    }

    #[cfg(feature = "database")]
    pub fn postgres(store: crate::database::PgContractStore) -> Self {
        let store = Arc::new(store);
        Self {
            contracts: store.clone(),
            templates: store.clone(),
            fee_structures: store.clone(),
            variables: store,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutcome {
    pub rendered_html: String,
    /// Placeholders left verbatim because no value resolved
    pub missing_placeholders: Vec<String>,
    /// Storage key of the uploaded snapshot; `None` for a blank template
    pub snapshot_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureChange {
    pub contract: Contract,
    /// Override keys the new fee structure does not define
    pub dropped_overrides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCheck {
    pub placeholders: Vec<String>,
    pub required_fee_variables: Vec<String>,
    pub unknown_namespaces: Vec<String>,
    /// Present when a fee structure was supplied
    pub compatibility: Option<CompatibilityReport>,
}

pub struct ContractService {
    stores: ContractStores,
    blob_store: Arc<dyn BlobStore>,
    resolver: VariableResolver,
    snapshot_prefix: String,
}

impl ContractService {
    pub fn new(
        stores: ContractStores,
        blob_store: Arc<dyn BlobStore>,
        config: &ContractsConfig,
    ) -> Self {
        Self {
            stores,
            blob_store,
            resolver: VariableResolver::new(config.resolver_options()),
            snapshot_prefix: config.snapshot_prefix.clone(),
        }
    }

    pub fn resolver(&self) -> &VariableResolver {
        &self.resolver
    }

    #[instrument(skip(self, request), fields(template_version_id = %request.template_version_id))]
    pub async fn create_contract(&self, request: NewContract) -> ContractResult<Contract> {
        let template = self.load_template(request.template_version_id).await?;
        let fee_structure = self.load_fee_structure(request.fee_structure_id).await?;

        check_unique_keys(&fee_structure)?;
        validate_template(&template.body_html, &fee_structure).into_result()?;

        let contract = Contract::new(template.id, fee_structure.id, request.field_values);
        self.stores.contracts.insert_contract(&contract).await?;

        info!(contract_id = %contract.id, fee_structure = %fee_structure.name, "contract created");
        Ok(contract)
    }

    /// Shallow merge: each namespace in `incoming` replaces the stored one
    #[instrument(skip(self, incoming))]
    pub async fn update_field_values(
        &self,
        contract_id: Uuid,
        incoming: FieldValues,
    ) -> ContractResult<Contract> {
        let contract = self
            .stores
            .contracts
            .update_field_values(contract_id, incoming)
            .await?;
        debug!("field values updated");
        Ok(contract)
    }

    /// Re-point a contract at another fee structure. Overrides for keys the
    /// new structure defines are kept; the rest are dropped and reported.
    #[instrument(skip(self))]
    pub async fn change_fee_structure(
        &self,
        contract_id: Uuid,
        fee_structure_id: Uuid,
    ) -> ContractResult<FeeStructureChange> {
        let contract = self.load_contract(contract_id).await?;
        let template = self.load_template(contract.template_version_id).await?;
        let fee_structure = self.load_fee_structure(fee_structure_id).await?;

        check_unique_keys(&fee_structure)?;
        validate_template(&template.body_html, &fee_structure).into_result()?;

        let (kept, dropped_overrides) =
            remap_overrides(contract.field_values.fees_overrides.as_ref(), &fee_structure);
        if !dropped_overrides.is_empty() {
            warn!(dropped = ?dropped_overrides, "fee overrides not defined by new fee structure");
        }

        let contract = self
            .stores
            .contracts
            .update_fee_structure(contract_id, fee_structure.id, kept)
            .await?;

        info!(fee_structure = %fee_structure.name, "fee structure changed");
        Ok(FeeStructureChange {
            contract,
            dropped_overrides,
        })
    }

    /// Store the signature under `examiner.signature` and stamp `signed_at`
    #[instrument(skip(self, signature))]
    pub async fn sign_contract(
        &self,
        contract_id: Uuid,
        signature: Scalar,
    ) -> ContractResult<Contract> {
        let contract = self
            .stores
            .contracts
            .record_signature(contract_id, signature, Utc::now())
            .await?;
        info!("contract signed");
        Ok(contract)
    }

    /// Render the contract, upload the snapshot and record it
    #[instrument(skip(self))]
    pub async fn preview_contract(&self, contract_id: Uuid) -> ContractResult<RenderOutcome> {
        let contract = self.load_contract(contract_id).await?;
        let template = self.load_template(contract.template_version_id).await?;
        let fee_structure = self.load_fee_structure(contract.fee_structure_id).await?;
        let globals = self.stores.variables.all_variables_map().await?;

        validate_template(&template.body_html, &fee_structure).into_result()?;

        let resolved = self.resolver.resolve(&contract, &fee_structure, &globals);

        if template.body_html.trim().is_empty() {
            debug!(template_version_id = %template.id, "template body is blank");
            return Ok(RenderOutcome {
                rendered_html: EMPTY_TEMPLATE_HTML.to_string(),
                missing_placeholders: Vec::new(),
                snapshot_key: None,
            });
        }

        let document = render(&template.body_html, &resolved);
        if !document.is_complete() {
            warn!(missing = ?document.missing, "unresolved placeholders left in contract");
        }

        let snapshot_key = self.snapshot_key(contract_id);
        self.blob_store
            .store(&snapshot_key, document.html.as_bytes(), SNAPSHOT_CONTENT_TYPE)
            .await?;

        let snapshot = RenderSnapshot {
            rendered_html: document.html.clone(),
            storage_key: snapshot_key.clone(),
            rendered_at: Utc::now(),
        };
        self.stores
            .contracts
            .record_snapshot(contract_id, &snapshot)
            .await?;

        info!(snapshot_key = %snapshot_key, "contract rendered");
        Ok(RenderOutcome {
            rendered_html: document.html,
            missing_placeholders: document.missing,
            snapshot_key: Some(snapshot_key),
        })
    }

    /// Fee amounts by role, overrides applied
    #[instrument(skip(self))]
    pub async fn examiner_fee_summary(&self, contract_id: Uuid) -> ContractResult<FeeSummary> {
        let contract = self.load_contract(contract_id).await?;
        let fee_structure = self.load_fee_structure(contract.fee_structure_id).await?;
        Ok(summarize(
            &fee_structure,
            &contract.field_values,
            self.resolver.formatter(),
        ))
    }

    /// Authoring check of a template version, optionally against a fee structure
    #[instrument(skip(self))]
    pub async fn check_template(
        &self,
        template_version_id: Uuid,
        fee_structure_id: Option<Uuid>,
    ) -> ContractResult<TemplateCheck> {
        let template = self.load_template(template_version_id).await?;
        let compatibility = match fee_structure_id {
            Some(id) => {
                let fee_structure = self.load_fee_structure(id).await?;
                Some(validate_template(&template.body_html, &fee_structure))
            }
            None => None,
        };

        Ok(TemplateCheck {
            placeholders: scan(&template.body_html),
            required_fee_variables: extract_required_fee_variables(&template.body_html),
            unknown_namespaces: unknown_namespaces(&template.body_html),
            compatibility,
        })
    }

    fn snapshot_key(&self, contract_id: Uuid) -> String {
        let sequence = SNAPSHOT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}/{}/unsigned-{}-{}.html",
            self.snapshot_prefix,
            contract_id,
            Utc::now().timestamp_millis(),
            sequence
        )
    }

    async fn load_contract(&self, id: Uuid) -> ContractResult<Contract> {
        self.stores
            .contracts
            .get_contract(id)
            .await?
            .ok_or_else(|| ContractError::not_found(RecordKind::Contract, id))
    }

    async fn load_template(&self, id: Uuid) -> ContractResult<TemplateVersion> {
        self.stores
            .templates
            .get_template_version(id)
            .await?
            .ok_or_else(|| ContractError::not_found(RecordKind::TemplateVersion, id))
    }

    async fn load_fee_structure(&self, id: Uuid) -> ContractResult<FeeStructure> {
        self.stores
            .fee_structures
            .get_fee_structure(id)
            .await?
            .ok_or_else(|| ContractError::not_found(RecordKind::FeeStructure, id))
    }
}

/// Split overrides into those the fee structure defines and the dropped keys
fn remap_overrides(
    overrides: Option<&ScalarMap>,
    fee_structure: &FeeStructure,
) -> (Option<ScalarMap>, Vec<String>) {
    let Some(overrides) = overrides else {
        return (None, Vec::new());
    };

    let mut kept = ScalarMap::new();
    let mut dropped = Vec::new();
    for (key, value) in overrides {
        if fee_structure.variable(key).is_some() {
            kept.insert(key.clone(), value.clone());
        } else {
            dropped.push(key.clone());
        }
    }

    let kept = if kept.is_empty() { None } else { Some(kept) };
    (kept, dropped)
}

//! In-memory repositories
//!
//! One store holds contracts, template versions and fee structures behind
//! `tokio` read/write locks. Each operation takes the lock once, so a write
//! is atomic with respect to concurrent readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ime_types::{Contract, FeeStructure, FieldValues, Namespace, Scalar, ScalarMap, TemplateVersion};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ContractRepository, FeeStructureRepository, RenderSnapshot, RepositoryError, TemplateRepository,
    VariableStore, SIGNATURE_FIELD,
};

#[derive(Default, Clone)]
pub struct InMemoryContractStore {
    contracts: Arc<RwLock<HashMap<Uuid, Contract>>>,
    templates: Arc<RwLock<HashMap<Uuid, TemplateVersion>>>,
    fee_structures: Arc<RwLock<HashMap<Uuid, FeeStructure>>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_template_version(&self, template: TemplateVersion) {
        self.templates.write().await.insert(template.id, template);
    }

    pub async fn insert_fee_structure(&self, fee_structure: FeeStructure) {
        self.fee_structures
            .write()
            .await
            .insert(fee_structure.id, fee_structure);
    }

    pub async fn contract_count(&self) -> usize {
        self.contracts.read().await.len()
    }

    async fn modify<F>(&self, id: Uuid, f: F) -> Result<Contract, RepositoryError>
    where
        F: FnOnce(&mut Contract) + Send,
    {
        let mut contracts = self.contracts.write().await;
        let contract = contracts
            .get_mut(&id)
            .ok_or(RepositoryError::ContractNotFound(id))?;
        f(contract);
        contract.updated_at = Utc::now();
        Ok(contract.clone())
    }
}

#[async_trait]
impl ContractRepository for InMemoryContractStore {
    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>, RepositoryError> {
        Ok(self.contracts.read().await.get(&id).cloned())
    }

    async fn insert_contract(&self, contract: &Contract) -> Result<(), RepositoryError> {
        let mut contracts = self.contracts.write().await;
        if contracts.contains_key(&contract.id) {
            return Err(RepositoryError::Duplicate(contract.id));
        }
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn update_field_values(
        &self,
        id: Uuid,
        incoming: FieldValues,
    ) -> Result<Contract, RepositoryError> {
        self.modify(id, |c| c.field_values.merge_shallow(incoming)).await
    }

    async fn update_fee_structure(
        &self,
        id: Uuid,
        fee_structure_id: Uuid,
        fees_overrides: Option<ScalarMap>,
    ) -> Result<Contract, RepositoryError> {
        self.modify(id, |c| {
            c.fee_structure_id = fee_structure_id;
            c.field_values.fees_overrides = fees_overrides;
        })
        .await
    }

    async fn record_snapshot(
        &self,
        id: Uuid,
        snapshot: &RenderSnapshot,
    ) -> Result<(), RepositoryError> {
        self.modify(id, |c| {
            c.data.rendered_html = Some(snapshot.rendered_html.clone());
            c.data.unsigned_html_key = Some(snapshot.storage_key.clone());
            c.data.last_rendered_at = Some(snapshot.rendered_at);
        })
        .await
        .map(|_| ())
    }

    async fn record_signature(
        &self,
        id: Uuid,
        signature: Scalar,
        signed_at: DateTime<Utc>,
    ) -> Result<Contract, RepositoryError> {
        self.modify(id, |c| {
            c.field_values
                .set_value(Namespace::Examiner, SIGNATURE_FIELD, signature);
            c.signed_at = Some(signed_at);
        })
        .await
    }
}

#[async_trait]
impl TemplateRepository for InMemoryContractStore {
    async fn get_template_version(
        &self,
        id: Uuid,
    ) -> Result<Option<TemplateVersion>, RepositoryError> {
        Ok(self.templates.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl FeeStructureRepository for InMemoryContractStore {
    async fn get_fee_structure(&self, id: Uuid) -> Result<Option<FeeStructure>, RepositoryError> {
        Ok(self.fee_structures.read().await.get(&id).cloned())
    }
}

/// System defaults plus organization-defined custom variables
#[derive(Debug, Default, Clone)]
pub struct InMemoryVariableStore {
    system: HashMap<String, String>,
    custom: HashMap<String, String>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system.insert(key.into(), value.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    pub fn from_maps(system: HashMap<String, String>, custom: HashMap<String, String>) -> Self {
        Self { system, custom }
    }
}

#[async_trait]
impl VariableStore for InMemoryVariableStore {
    async fn all_variables_map(&self) -> Result<HashMap<String, String>, RepositoryError> {
        let mut merged = self.system.clone();
        merged.extend(self.custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(merged)
    }
}

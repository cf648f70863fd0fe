//! Shared fixtures for contract service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ime_contracts::types::{
    Contract, FeeStructure, FeeVariable, FieldValues, NewContract, Scalar, TemplateVersion,
};
use ime_contracts::{
    BlobStore, BlobStoreError, ContractRepository, ContractService, ContractStores, ContractsConfig,
    InMemoryBlobStore, InMemoryContractStore, InMemoryVariableStore,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub service: ContractService,
    pub store: InMemoryContractStore,
    pub blobs: InMemoryBlobStore,
}

impl Harness {
    pub fn new(variables: InMemoryVariableStore) -> Self {
        let store = InMemoryContractStore::new();
        let blobs = InMemoryBlobStore::new();
        let service = ContractService::new(
            ContractStores::in_memory(store.clone(), variables),
            Arc::new(blobs.clone()),
            &ContractsConfig::default(),
        );
        Self { service, store, blobs }
    }

    /// Service whose blob store rejects every upload
    pub fn with_failing_storage() -> Self {
        let store = InMemoryContractStore::new();
        let service = ContractService::new(
            ContractStores::in_memory(store.clone(), InMemoryVariableStore::new()),
            Arc::new(FailingBlobStore),
            &ContractsConfig::default(),
        );
        Self {
            service,
            store,
            blobs: InMemoryBlobStore::new(),
        }
    }

    pub async fn template(&self, body: &str) -> Uuid {
        let template = TemplateVersion::new(Uuid::now_v7(), 1, body);
        let id = template.id;
        self.store.insert_template_version(template).await;
        id
    }

    pub async fn fee_structure(&self, fee_structure: FeeStructure) -> Uuid {
        let id = fee_structure.id;
        self.store.insert_fee_structure(fee_structure).await;
        id
    }

    pub async fn stored_contract(&self, id: Uuid) -> Contract {
        self.store
            .get_contract(id)
            .await
            .expect("repository read")
            .expect("contract stored")
    }

    /// Seed template and fee structure, then create the contract through the service
    pub async fn contract(
        &self,
        body: &str,
        fee_structure: FeeStructure,
        field_values: FieldValues,
    ) -> Contract {
        let template_version_id = self.template(body).await;
        let fee_structure_id = self.fee_structure(fee_structure).await;
        self.service
            .create_contract(NewContract {
                template_version_id,
                fee_structure_id,
                field_values,
            })
            .await
            .expect("contract should be created")
    }
}

/// `ime_fee` of $200 by default
pub fn standard_fees() -> FeeStructure {
    FeeStructure::new(
        "Standard IME",
        vec![FeeVariable::money("ime_fee", "IME Fee", Scalar::Integer(200))],
    )
}

pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn store(
        &self,
        _key: &str,
        _content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        Err(BlobStoreError::Storage("bucket unavailable".to_string()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        Err(BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, _blob_ref: &str) -> Result<(), BlobStoreError> {
        Ok(())
    }

    async fn exists(&self, _blob_ref: &str) -> Result<bool, BlobStoreError> {
        Ok(false)
    }
}

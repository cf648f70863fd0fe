//! Data access for contracts, templates, fee structures and global variables
//!
//! The rendering core only reads templates and fee structures; it writes
//! contracts through a handful of narrow operations. `memory` backs tests
//! and the CLI, `postgres` (feature `database`) backs deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ime_types::{Contract, FeeStructure, FieldValues, Scalar, ScalarMap, TemplateVersion};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::{InMemoryContractStore, InMemoryVariableStore};
#[cfg(feature = "database")]
pub use postgres::PgContractStore;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Contract not found: {0}")]
    ContractNotFound(Uuid),

    #[error("Duplicate record: {0}")]
    Duplicate(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        RepositoryError::Backend(error.to_string())
    }
}

/// Key of the signature value inside the examiner namespace
pub const SIGNATURE_FIELD: &str = "signature";

/// Rendered snapshot written back to a contract
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub rendered_html: String,
    pub storage_key: String,
    pub rendered_at: DateTime<Utc>,
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>, RepositoryError>;

    async fn insert_contract(&self, contract: &Contract) -> Result<(), RepositoryError>;

    /// Shallow merge: each namespace present in `incoming` replaces the
    /// stored namespace; absent namespaces are kept.
    async fn update_field_values(
        &self,
        id: Uuid,
        incoming: FieldValues,
    ) -> Result<Contract, RepositoryError>;

    /// Point the contract at another fee structure and replace its
    /// `fees_overrides` namespace.
    async fn update_fee_structure(
        &self,
        id: Uuid,
        fee_structure_id: Uuid,
        fees_overrides: Option<ScalarMap>,
    ) -> Result<Contract, RepositoryError>;

    /// Record the last rendered HTML and its storage key. Last write wins.
    async fn record_snapshot(
        &self,
        id: Uuid,
        snapshot: &RenderSnapshot,
    ) -> Result<(), RepositoryError>;

    /// Store `examiner.signature` (other examiner keys kept) and `signed_at`
    async fn record_signature(
        &self,
        id: Uuid,
        signature: Scalar,
        signed_at: DateTime<Utc>,
    ) -> Result<Contract, RepositoryError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn get_template_version(
        &self,
        id: Uuid,
    ) -> Result<Option<TemplateVersion>, RepositoryError>;
}

#[async_trait]
pub trait FeeStructureRepository: Send + Sync {
    async fn get_fee_structure(&self, id: Uuid) -> Result<Option<FeeStructure>, RepositoryError>;
}

/// Read-only snapshot of system and organization-defined variables
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Fully-qualified key -> value; organization values win over system ones
    async fn all_variables_map(&self) -> Result<HashMap<String, String>, RepositoryError>;
}

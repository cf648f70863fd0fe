//! IME contract rendering
//!
//! Resolves contract placeholders from the examiner, contract, organization,
//! fee-structure and global namespaces, renders the template body, and
//! records the rendered snapshot.
//!
//! ```ignore
//! use ime_contracts::{ContractService, ContractStores, ContractsConfig, InMemoryBlobStore};
//!
//! let service = ContractService::new(stores, Arc::new(InMemoryBlobStore::new()), &config);
//! let outcome = service.preview_contract(contract_id).await?;
//! for name in &outcome.missing_placeholders {
//!     println!("unresolved: {name}");
//! }
//! ```

pub mod blob_store;
pub mod config;
pub mod database;
pub mod error;
pub mod services;

pub use blob_store::{BlobStore, BlobStoreError, InMemoryBlobStore, LocalBlobStore};
pub use config::ContractsConfig;
#[cfg(feature = "database")]
pub use config::DatabaseConfig;
pub use database::{
    ContractRepository, FeeStructureRepository, InMemoryContractStore, InMemoryVariableStore,
    RenderSnapshot, RepositoryError, TemplateRepository, VariableStore,
};
pub use error::{ContractError, ContractResult, RecordKind};
pub use services::{
    ContractService, ContractStores, FeeStructureChange, RenderOutcome, TemplateCheck,
    EMPTY_TEMPLATE_HTML,
};

// Engine and domain types, so callers need a single dependency
pub use ime_templates as templates;
pub use ime_types as types;

//! Services for the contract rendering core
//!
//! `ContractService` is the single entry point for operations that write a
//! contract or upload a snapshot.

pub mod contract_service;

pub use contract_service::{
    ContractService, ContractStores, FeeStructureChange, RenderOutcome, TemplateCheck,
    EMPTY_TEMPLATE_HTML, SNAPSHOT_CONTENT_TYPE,
};

//! Error types for contract operations
//!
//! `NotFound` and `IncompatibleFeeStructure` are raised before any write.
//! `StorageFailure` is raised after an in-memory render succeeded but the
//! snapshot could not be uploaded; the contract is left unchanged.

use std::fmt;

use ime_templates::TemplateError;
use thiserror::Error;
use uuid::Uuid;

use crate::blob_store::BlobStoreError;
use crate::database::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Contract,
    TemplateVersion,
    FeeStructure,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Contract => "Contract",
            RecordKind::TemplateVersion => "Template version",
            RecordKind::FeeStructure => "Fee structure",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: Uuid },

    #[error(
        "Fee structure is incompatible with the template; missing variables: {}",
        missing.join(", ")
    )]
    IncompatibleFeeStructure { missing: Vec<String> },

    #[error("Failed to persist rendered snapshot: {0}")]
    StorageFailure(#[from] BlobStoreError),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Template error: {0}")]
    Template(TemplateError),
}

impl ContractError {
    pub fn not_found(kind: RecordKind, id: Uuid) -> Self {
        ContractError::NotFound { kind, id }
    }

    /// Missing variable keys when the error is a compatibility failure
    pub fn missing_variables(&self) -> Option<&[String]> {
        match self {
            ContractError::IncompatibleFeeStructure { missing } => Some(missing),
            _ => None,
        }
    }
}

impl From<TemplateError> for ContractError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::IncompatibleFeeStructure { missing } => {
                ContractError::IncompatibleFeeStructure { missing }
            }
            other => ContractError::Template(other),
        }
    }
}

impl From<RepositoryError> for ContractError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ContractNotFound(id) => {
                ContractError::not_found(RecordKind::Contract, id)
            }
            other => ContractError::Repository(other),
        }
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_message_lists_keys() {
        let err: ContractError = TemplateError::IncompatibleFeeStructure {
            missing: vec!["ime_fee".to_string(), "no_show_fee".to_string()],
        }
        .into();
        assert_eq!(
            err.to_string(),
            concat!(
                "Fee structure is incompatible with the template; ",
                "missing variables: ime_fee, no_show_fee"
            )
        );
        assert_eq!(err.missing_variables().unwrap().len(), 2);
    }

    #[test]
    fn test_repository_not_found_maps_to_contract() {
        let id = Uuid::now_v7();
        let err: ContractError = RepositoryError::ContractNotFound(id).into();
        assert!(matches!(
            err,
            ContractError::NotFound { kind: RecordKind::Contract, id: found } if found == id
        ));
    }
}

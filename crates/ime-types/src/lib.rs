//! Shared types for the IME contract pipeline
//!
//! Single source of truth for the records that cross crate boundaries:
//! - `Contract` - aggregate root with namespaced field values
//! - `FeeStructure` / `FeeVariable` - the `fees.*` namespace definition
//! - `TemplateVersion` - immutable template body referenced by contracts
//! - `Scalar` - free-form field value (JSON scalar)

mod contract;
mod fee;
mod namespace;
mod scalar;

pub use contract::{Contract, ContractData, FieldValues, NewContract, ScalarMap, TemplateVersion};
pub use fee::{FeeStructure, FeeVariable, VariableType};
pub use namespace::{Namespace, NamespaceError};
pub use scalar::Scalar;

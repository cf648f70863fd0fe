//! Fee-Structure Compatibility
//!
//! A fee structure is compatible with a template when it defines every
//! variable the template references as `{{fees.<key>}}`. Callers run this
//! before creating a contract, changing its fee structure, or rendering.

use ime_types::{FeeStructure, FeeVariable};
use serde::Serialize;
use std::collections::HashSet;

use crate::scanner::extract_required_fee_variables;
use crate::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub compatible: bool,
    /// Required keys with no matching variable, in required order
    pub missing_variables: Vec<String>,
}

impl CompatibilityReport {
    pub fn into_result(self) -> Result<(), TemplateError> {
        if self.compatible {
            Ok(())
        } else {
            Err(TemplateError::IncompatibleFeeStructure {
                missing: self.missing_variables,
            })
        }
    }
}

pub fn validate(required: &[String], supplied: &[FeeVariable]) -> CompatibilityReport {
    let supplied_keys: HashSet<&str> = supplied.iter().map(|v| v.key.as_str()).collect();
    let mut missing_variables: Vec<String> = Vec::new();
    for key in required {
        if !supplied_keys.contains(key.as_str()) && !missing_variables.contains(key) {
            missing_variables.push(key.clone());
        }
    }
    CompatibilityReport {
        compatible: missing_variables.is_empty(),
        missing_variables,
    }
}

/// Scan the template body and validate the fee structure against it
pub fn validate_template(body: &str, fee_structure: &FeeStructure) -> CompatibilityReport {
    let required = extract_required_fee_variables(body);
    let report = validate(&required, &fee_structure.variables);
    if !report.compatible {
        tracing::debug!(
            fee_structure = %fee_structure.name,
            missing = ?report.missing_variables,
            "fee structure incompatible with template"
        );
    }
    report
}

/// Reject fee structures that define a key more than once
pub fn check_unique_keys(fee_structure: &FeeStructure) -> Result<(), TemplateError> {
    let keys = fee_structure.duplicate_keys();
    if keys.is_empty() {
        Ok(())
    } else {
        Err(TemplateError::DuplicateVariableKey { keys })
    }
}

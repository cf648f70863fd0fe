//! Fee structures
//!
//! A fee structure is a named set of variables. Its variables populate the
//! `fees.*` template namespace; per-contract `fees_overrides` win over the
//! variable defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    Money,
    Number,
    #[default]
    Text,
}

/// One variable of a fee structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeVariable {
    /// Unique within its structure; referenced as `{{fees.<key>}}`
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub variable_type: VariableType,
    #[serde(default)]
    pub default_value: Option<Scalar>,
    /// ISO 4217 code for MONEY variables
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub decimals: Option<u32>,
    /// Display unit (e.g. "hour", "page")
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl FeeVariable {
    /// MONEY variable with a default amount
    pub fn money(key: impl Into<String>, label: impl Into<String>, default_value: Scalar) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            variable_type: VariableType::Money,
            default_value: Some(default_value),
            currency: None,
            decimals: None,
            unit: None,
            required: true,
            sort_order: 0,
        }
    }

    pub fn number(key: impl Into<String>, label: impl Into<String>, default_value: Scalar) -> Self {
        Self {
            variable_type: VariableType::Number,
            ..Self::money(key, label, default_value)
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Text,
            default_value: None,
            required: false,
            ..Self::money(key, label, Scalar::Null)
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }
}

/// A named set of fee variables selected per contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructure {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<FeeVariable>,
}

impl FeeStructure {
    pub fn new(name: impl Into<String>, variables: Vec<FeeVariable>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            variables,
        }
    }

    pub fn variable(&self, key: &str) -> Option<&FeeVariable> {
        self.variables.iter().find(|v| v.key == key)
    }

    /// Variables ordered for display (sort_order, then key)
    pub fn sorted_variables(&self) -> Vec<&FeeVariable> {
        let mut vars: Vec<_> = self.variables.iter().collect();
        vars.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.key.cmp(&b.key)));
        vars
    }

    /// Keys that appear more than once, in first-duplicate order
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for var in &self.variables {
            if !seen.insert(var.key.as_str()) && !dupes.contains(&var.key) {
                dupes.push(var.key.clone());
            }
        }
        dupes
    }
}

//! Placeholder Scanner
//!
//! A placeholder is `{{ namespace.key }}`: dot-separated identifier tokens
//! inside double braces, whitespace around the name ignored.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use crate::TemplateError;

pub(crate) static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)+)\s*\}\}").unwrap()
});

/// Namespaces a template may reference
pub const KNOWN_NAMESPACES: &[&str] = &[
    "examiner", "contract", "thrive", "org", "fees", "custom", "system",
];

/// Namespace prefix of fee-structure variables
pub const FEES_NAMESPACE: &str = "fees";

/// A parsed placeholder name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub namespace: String,
    /// Everything after the first dot
    pub key: String,
}

impl Placeholder {
    pub fn parse(name: &str) -> Result<Self, TemplateError> {
        match name.split_once('.') {
            Some((namespace, key)) if !namespace.is_empty() && !key.is_empty() => Ok(Self {
                namespace: namespace.to_string(),
                key: key.to_string(),
            }),
            _ => Err(TemplateError::InvalidPlaceholder(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }

    pub fn is_known_namespace(&self) -> bool {
        KNOWN_NAMESPACES.contains(&self.namespace.as_str())
    }
}

/// Distinct placeholder names in order of first occurrence
pub fn scan(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Distinct placeholder names as a set
pub fn scan_set(body: &str) -> BTreeSet<String> {
    PLACEHOLDER_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Fee variable keys the template requires, `fees.` prefix stripped
pub fn extract_required_fee_variables(body: &str) -> Vec<String> {
    scan(body)
        .into_iter()
        .filter_map(|name| {
            name.strip_prefix(FEES_NAMESPACE)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(str::to_string)
        })
        .collect()
}

/// Placeholders whose namespace is not one a template may reference
pub fn unknown_namespaces(body: &str) -> Vec<String> {
    scan(body)
        .into_iter()
        .filter(|name| {
            Placeholder::parse(name)
                .map(|p| !p.is_known_namespace())
                .unwrap_or(true)
        })
        .collect()
}

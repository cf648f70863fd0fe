//! Variable Resolver
//!
//! Builds the flat `namespace.key -> display string` map for one render.
//! Layers, lowest precedence first:
//! 1. Global variables (system defaults + organization custom variables)
//! 2. Fee-structure variables, with `fees_overrides` applied
//! 3. Contract field values (`examiner`, `contract`, `thrive` / legacy `org`)
//! 4. Derived `examiner.signature_date_time`
//!
//! Absent layers are skipped. Required-value checks belong to the
//! compatibility validator; the resolver never fails.

use chrono::{FixedOffset, Offset, Utc};
use ime_types::{Contract, FeeStructure, FieldValues, Namespace, ScalarMap};
use std::collections::{BTreeMap, HashMap};

use crate::format::{ValueFormatter, DEFAULT_CURRENCY};

/// Fully-qualified key -> display-formatted value
pub type ResolvedValueMap = BTreeMap<String, String>;

pub const SIGNATURE_KEY: &str = "examiner.signature";
pub const SIGNATURE_DATE_TIME_KEY: &str = "examiner.signature_date_time";

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Currency for MONEY variables that do not name one
    pub default_currency: String,
    /// Offset used when formatting the signature date
    pub signature_utc_offset: FixedOffset,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            signature_utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    formatter: ValueFormatter,
}

impl VariableResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            formatter: ValueFormatter::new(options.default_currency, options.signature_utc_offset),
        }
    }

    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    pub fn resolve(
        &self,
        contract: &Contract,
        fee_structure: &FeeStructure,
        globals: &HashMap<String, String>,
    ) -> ResolvedValueMap {
        let mut resolved: ResolvedValueMap = globals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.layer_fees(&mut resolved, fee_structure, &contract.field_values);
        layer_field_values(&mut resolved, &contract.field_values);

        if let Some(signed_at) = &contract.signed_at {
            resolved.insert(
                SIGNATURE_DATE_TIME_KEY.to_string(),
                self.formatter.format_signature_date(signed_at),
            );
        }

        tracing::trace!(
            contract_id = %contract.id,
            entries = resolved.len(),
            "resolved template variables"
        );
        resolved
    }

    /// `fees.*` entries only, overrides applied
    pub fn resolve_fees(
        &self,
        fee_structure: &FeeStructure,
        field_values: &FieldValues,
    ) -> ResolvedValueMap {
        let mut resolved = ResolvedValueMap::new();
        self.layer_fees(&mut resolved, fee_structure, field_values);
        resolved
    }

    fn layer_fees(
        &self,
        resolved: &mut ResolvedValueMap,
        fee_structure: &FeeStructure,
        field_values: &FieldValues,
    ) {
        for variable in &fee_structure.variables {
            let value = self
                .formatter
                .format_variable(variable, field_values.fee_override(&variable.key));
            resolved.insert(Namespace::Fees.qualify(&variable.key), value);
        }
    }
}

fn layer_field_values(resolved: &mut ResolvedValueMap, field_values: &FieldValues) {
    layer_namespace(resolved, Namespace::Examiner, field_values.examiner.as_ref());
    layer_namespace(resolved, Namespace::Contract, field_values.contract.as_ref());

    // Organization defaults are written under `thrive`; older contracts
    // stored them under `org`.
    let organization = field_values
        .thrive
        .as_ref()
        .or(field_values.org.as_ref());
    layer_namespace(resolved, Namespace::Thrive, organization);
}

fn layer_namespace(
    resolved: &mut ResolvedValueMap,
    namespace: Namespace,
    values: Option<&ScalarMap>,
) {
    let Some(values) = values else {
        return;
    };
    for (key, value) in values {
        resolved.insert(namespace.qualify(key), value.to_display_string());
    }
}

//! Contract Template Engine
//!
//! Turns a template body with `{{namespace.key}}` placeholders plus a
//! contract's data into rendered HTML.
//!
//! Pipeline:
//! - `scanner` - extract distinct placeholder names from a body
//! - `compatibility` - check that a fee structure supplies every `fees.*` key
//! - `resolver` - merge globals, fee variables and field values into a flat map
//! - `substitution` - replace placeholders, report the ones left unresolved
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use ime_templates::render;
//!
//! let mut resolved = BTreeMap::new();
//! resolved.insert("examiner.name".to_string(), "Dr. Smith".to_string());
//!
//! let doc = render("Examiner: {{ examiner.name }} {{contract.date}}", &resolved);
//! assert_eq!(doc.html, "Examiner: Dr. Smith {{contract.date}}");
//! assert_eq!(doc.missing, vec!["contract.date".to_string()]);
//! ```

pub mod compatibility;
mod error;
pub mod fee_roles;
pub mod format;
pub mod resolver;
pub mod scanner;
pub mod substitution;

pub use compatibility::{validate, validate_template, CompatibilityReport};
pub use error::TemplateError;
pub use fee_roles::{FeeRole, FeeSummary, FeeSummaryLine};
pub use format::ValueFormatter;
pub use resolver::{ResolvedValueMap, ResolverOptions, VariableResolver};
pub use scanner::{extract_required_fee_variables, scan, scan_set, Placeholder};
pub use substitution::{render, RenderedDocument, OPTIONAL_SIGNATURE_PLACEHOLDERS};

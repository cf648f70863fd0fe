use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Fee structure is missing required variables: {}", missing.join(", "))]
    IncompatibleFeeStructure { missing: Vec<String> },

    #[error("Invalid placeholder '{0}': expected namespace.key")]
    InvalidPlaceholder(String),

    #[error("Fee structure defines variable keys more than once: {}", keys.join(", "))]
    DuplicateVariableKey { keys: Vec<String> },
}

//! Free-form field values
//!
//! Contract field values are untyped key/value bags. A value is any JSON
//! scalar; nested objects and arrays are not accepted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A JSON scalar stored in a contract namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Plain string form of the value.
    ///
    /// Null renders as the empty string; floats use the shortest
    /// representation that round-trips (`150.0` renders as `150`).
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Text is parsed after trimming; booleans and null have no numeric view.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Integer(i) => Some(Decimal::from(*i)),
            Scalar::Float(f) => Decimal::try_from(*f).ok(),
            Scalar::Text(s) => Decimal::from_str(s.trim()).ok(),
            Scalar::Null | Scalar::Bool(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<Decimal> for Scalar {
    fn from(value: Decimal) -> Self {
        Scalar::Text(value.to_string())
    }
}

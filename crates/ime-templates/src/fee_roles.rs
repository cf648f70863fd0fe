//! Fee roles for the examiner fee summary
//!
//! The examiner-facing fee view shows a fixed set of slots (IME fee, record
//! review, hourly rate, ...). Fee structures name their variables freely, so
//! each known variable key is mapped to a slot through `FEE_ROLE_TABLE`.
//! Keys missing from the table are reported as unclassified rather than
//! guessed from their spelling.

use ime_types::{FeeStructure, FieldValues, VariableType};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::format::{effective_value, ValueFormatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeRole {
    ImeFee,
    RecordReviewFee,
    ReportFee,
    AddendumFee,
    HourlyRate,
    CancellationFee,
    NoShowFee,
    TravelFee,
}

impl FeeRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ImeFee => "IME Fee",
            Self::RecordReviewFee => "Record Review Fee",
            Self::ReportFee => "Report Fee",
            Self::AddendumFee => "Addendum Fee",
            Self::HourlyRate => "Hourly Rate",
            Self::CancellationFee => "Cancellation Fee",
            Self::NoShowFee => "No-Show Fee",
            Self::TravelFee => "Travel Fee",
        }
    }

    /// Role for a fee-variable key, if the key is in the table
    pub fn for_key(key: &str) -> Option<FeeRole> {
        FEE_ROLE_TABLE
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, role)| *role)
    }
}

/// Known fee-variable keys and the slot each one fills
pub const FEE_ROLE_TABLE: &[(&str, FeeRole)] = &[
    ("ime_fee", FeeRole::ImeFee),
    ("base_exam_fee", FeeRole::ImeFee),
    ("exam_fee", FeeRole::ImeFee),
    ("assessment_fee", FeeRole::ImeFee),
    ("record_review_fee", FeeRole::RecordReviewFee),
    ("records_review_fee", FeeRole::RecordReviewFee),
    ("file_review_fee", FeeRole::RecordReviewFee),
    ("report_fee", FeeRole::ReportFee),
    ("report_writing_fee", FeeRole::ReportFee),
    ("addendum_fee", FeeRole::AddendumFee),
    ("hourly_rate", FeeRole::HourlyRate),
    ("additional_hour_rate", FeeRole::HourlyRate),
    ("cancellation_fee", FeeRole::CancellationFee),
    ("late_cancellation_fee", FeeRole::CancellationFee),
    ("no_show_fee", FeeRole::NoShowFee),
    ("travel_fee", FeeRole::TravelFee),
    ("mileage_rate", FeeRole::TravelFee),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummaryLine {
    pub role: FeeRole,
    pub key: String,
    pub label: String,
    /// Effective numeric amount (override, else default)
    pub amount: Option<Decimal>,
    /// Same value formatted as it renders in the contract
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub fee_structure: String,
    pub lines: Vec<FeeSummaryLine>,
    /// MONEY/NUMBER keys with no entry in the role table
    pub unclassified: Vec<String>,
}

impl FeeSummary {
    /// First line filling a role
    pub fn line(&self, role: FeeRole) -> Option<&FeeSummaryLine> {
        self.lines.iter().find(|l| l.role == role)
    }

    pub fn amount_for(&self, role: FeeRole) -> Option<Decimal> {
        self.line(role).and_then(|l| l.amount)
    }
}

/// Examiner fee view with `fees_overrides` applied
pub fn summarize(
    fee_structure: &FeeStructure,
    field_values: &FieldValues,
    formatter: &ValueFormatter,
) -> FeeSummary {
    let mut lines = Vec::new();
    let mut unclassified = Vec::new();

    for variable in fee_structure.sorted_variables() {
        let override_value = field_values.fee_override(&variable.key);
        match FeeRole::for_key(&variable.key) {
            Some(role) => lines.push(FeeSummaryLine {
                role,
                key: variable.key.clone(),
                label: variable.label.clone(),
                amount: effective_value(variable, override_value).and_then(|v| v.to_decimal()),
                display: formatter.format_variable(variable, override_value),
            }),
            None if variable.variable_type != VariableType::Text => {
                unclassified.push(variable.key.clone())
            }
            None => {}
        }
    }

    FeeSummary {
        fee_structure: fee_structure.name.clone(),
        lines,
        unclassified,
    }
}

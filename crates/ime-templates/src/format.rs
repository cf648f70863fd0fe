//! Display formatting for resolved values
//!
//! Formatting is deterministic in (value, currency, decimals). Rounding is
//! half away from zero, matching the locale formatter used for on-screen fee
//! displays.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use ime_types::{FeeVariable, Scalar, VariableType};
use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_MONEY_DECIMALS: u32 = 2;
pub const DEFAULT_NUMBER_DECIMALS: u32 = 0;

/// `March 5, 2024, 2:07 PM`
pub const SIGNATURE_DATE_FORMAT: &str = "%B %-d, %Y, %-I:%M %p";

/// Currency code to display symbol. Codes not listed render as `"<CODE> "`.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("CAD", "CA$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("AUD", "A$"),
    ("INR", "₹"),
];

#[derive(Debug, Clone)]
pub struct ValueFormatter {
    default_currency: String,
    utc_offset: FixedOffset,
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            utc_offset: Utc.fix(),
        }
    }
}

impl ValueFormatter {
    pub fn new(default_currency: impl Into<String>, utc_offset: FixedOffset) -> Self {
        Self {
            default_currency: default_currency.into(),
            utc_offset,
        }
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Format a fee variable, using `override_value` in place of the default
    /// when it is present and not null.
    pub fn format_variable(
        &self,
        variable: &FeeVariable,
        override_value: Option<&Scalar>,
    ) -> String {
        let effective = effective_value(variable, override_value);
        match variable.variable_type {
            VariableType::Money => {
                let currency = variable
                    .currency
                    .as_deref()
                    .unwrap_or(&self.default_currency);
                let decimals = variable.decimals.unwrap_or(DEFAULT_MONEY_DECIMALS);
                format_numeric(effective, |amount| format_money(amount, currency, decimals))
            }
            VariableType::Number => {
                let decimals = variable.decimals.unwrap_or(DEFAULT_NUMBER_DECIMALS);
                format_numeric(effective, |amount| format_fixed(amount, decimals))
            }
            VariableType::Text => effective
                .map(Scalar::to_display_string)
                .unwrap_or_default(),
        }
    }

    pub fn format_signature_date(&self, signed_at: &DateTime<Utc>) -> String {
        signed_at
            .with_timezone(&self.utc_offset)
            .format(SIGNATURE_DATE_FORMAT)
            .to_string()
    }
}

/// `fees_overrides[key] ?? default_value`; a null override counts as absent
pub fn effective_value<'a>(
    variable: &'a FeeVariable,
    override_value: Option<&'a Scalar>,
) -> Option<&'a Scalar> {
    override_value
        .filter(|v| !v.is_null())
        .or(variable.default_value.as_ref())
        .filter(|v| !v.is_null())
}

fn format_numeric(value: Option<&Scalar>, f: impl Fn(Decimal) -> String) -> String {
    match value {
        Some(v) => match v.to_decimal() {
            Some(amount) => f(amount),
            None => v.to_display_string(),
        },
        None => String::new(),
    }
}

/// Rounded amount split into sign, integer digits and exactly `decimals`
/// fraction digits, zero-padded whatever the scale of the value.
struct FixedParts {
    negative: bool,
    int_part: String,
    frac_part: String,
}

impl FixedParts {
    fn new(amount: Decimal, decimals: u32) -> Self {
        let rounded =
            amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
        let digits = rounded.abs().to_string();
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
        Self {
            negative: rounded.is_sign_negative() && !rounded.is_zero(),
            int_part: int_part.to_string(),
            frac_part: format!("{:0<width$}", frac_part, width = decimals as usize),
        }
    }

    fn write_fraction(&self, out: &mut String) {
        if !self.frac_part.is_empty() {
            out.push('.');
            out.push_str(&self.frac_part);
        }
    }
}

/// Fixed-point string with exactly `decimals` fraction digits, no grouping
pub fn format_fixed(amount: Decimal, decimals: u32) -> String {
    let parts = FixedParts::new(amount, decimals);
    let mut out = String::new();
    if parts.negative {
        out.push('-');
    }
    out.push_str(&parts.int_part);
    parts.write_fraction(&mut out);
    out
}

/// Currency string: symbol, thousands separators, exactly `decimals` digits
pub fn format_money(amount: Decimal, currency: &str, decimals: u32) -> String {
    let parts = FixedParts::new(amount, decimals);
    let mut out = String::new();
    if parts.negative {
        out.push('-');
    }
    out.push_str(&currency_prefix(currency));
    out.push_str(&group_thousands(&parts.int_part));
    parts.write_fraction(&mut out);
    out
}

fn currency_prefix(currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| format!("{} ", code))
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_money_decimals() {
        assert_eq!(format_money(dec("150"), "USD", 2), "$150.00");
        assert_eq!(format_money(dec("150"), "USD", 0), "$150");
        assert_eq!(format_money(dec("1234567.891"), "USD", 2), "$1,234,567.89");
        assert_eq!(format_money(dec("2.345"), "USD", 2), "$2.35");
        assert_eq!(format_money(dec("999.5"), "USD", 0), "$1,000");
    }

    #[test]
    fn test_money_currencies() {
        assert_eq!(format_money(dec("150"), "CAD", 2), "CA$150.00");
        assert_eq!(format_money(dec("150"), "eur", 2), "€150.00");
        assert_eq!(format_money(dec("150"), "CHF", 2), "CHF 150.00");
    }

    #[test]
    fn test_money_negative() {
        assert_eq!(format_money(dec("-1500"), "USD", 2), "-$1,500.00");
        assert_eq!(format_money(dec("-0.001"), "USD", 2), "$0.00");
    }

    #[test]
    fn test_money_at_decimal_limits() {
        assert_eq!(
            format_money(Decimal::MAX, "USD", 2),
            "$79,228,162,514,264,337,593,543,950,335.00"
        );
        assert_eq!(
            format_money(dec("150"), "USD", 40),
            format!("$150.{}", "0".repeat(40))
        );
        assert_eq!(
            format_fixed(Decimal::MIN, 1),
            "-79228162514264337593543950335.0"
        );
        assert_eq!(format_fixed(dec("0.1234"), 30), format!("0.1234{}", "0".repeat(26)));
    }

    #[test]
    fn test_fixed() {
        assert_eq!(format_fixed(dec("3.5"), 0), "4");
        assert_eq!(format_fixed(dec("3"), 2), "3.00");
        assert_eq!(format_fixed(dec("1234.5678"), 1), "1234.6");
    }

    #[test]
    fn test_format_variable_override_wins() {
        let formatter = ValueFormatter::default();
        let var =
            FeeVariable::money("ime_fee", "IME Fee", Scalar::Integer(200)).with_currency("USD");
        assert_eq!(formatter.format_variable(&var, None), "$200.00");
        assert_eq!(
            formatter.format_variable(&var, Some(&Scalar::Integer(350))),
            "$350.00"
        );
        // Null override falls back to the default
        assert_eq!(formatter.format_variable(&var, Some(&Scalar::Null)), "$200.00");
    }

    #[test]
    fn test_format_variable_fallback_currency() {
        let formatter = ValueFormatter::new("CAD", FixedOffset::east_opt(0).unwrap());
        let var = FeeVariable::money("ime_fee", "IME Fee", Scalar::from("99.9"));
        assert_eq!(formatter.format_variable(&var, None), "CA$99.90");
    }

    #[test]
    fn test_format_variable_number_and_text() {
        let formatter = ValueFormatter::default();
        let hours = FeeVariable::number("hours", "Hours", Scalar::Float(2.5));
        assert_eq!(formatter.format_variable(&hours, None), "3");
        assert_eq!(
            formatter.format_variable(&hours.clone().with_decimals(2), None),
            "2.50"
        );

        let notes = FeeVariable::text("notes", "Notes");
        assert_eq!(formatter.format_variable(&notes, None), "");
        assert_eq!(
            formatter.format_variable(&notes, Some(&Scalar::from("Net 30"))),
            "Net 30"
        );
    }

    #[test]
    fn test_non_numeric_money_falls_back_to_raw() {
        let formatter = ValueFormatter::default();
        let var = FeeVariable::money("ime_fee", "IME Fee", Scalar::from("TBD"));
        assert_eq!(formatter.format_variable(&var, None), "TBD");
    }

    #[test]
    fn test_signature_date() {
        let formatter = ValueFormatter::default();
        let signed = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(formatter.format_signature_date(&signed), "March 5, 2024, 2:07 PM");

        let eastern = ValueFormatter::new("USD", FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(eastern.format_signature_date(&signed), "March 5, 2024, 9:07 AM");
    }
}

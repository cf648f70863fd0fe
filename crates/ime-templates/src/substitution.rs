//! Substitution Engine
//!
//! Replaces every resolved placeholder in a template body. Two keys get
//! markup instead of text (`thrive.logo`, `examiner.signature`). The two
//! signature placeholders are optional and collapse to "" until the contract
//! is signed; any other unresolved placeholder stays in the output verbatim
//! and is reported in `missing`.

use regex::Captures;
use serde::Serialize;

use crate::resolver::{ResolvedValueMap, SIGNATURE_DATE_TIME_KEY, SIGNATURE_KEY};
use crate::scanner::PLACEHOLDER_RE;

pub const LOGO_KEY: &str = "thrive.logo";

/// Placeholders filled only after a signing event
pub const OPTIONAL_SIGNATURE_PLACEHOLDERS: [&str; 2] = [SIGNATURE_KEY, SIGNATURE_DATE_TIME_KEY];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    /// Unresolved placeholder names, first-occurrence order
    pub missing: Vec<String>,
}

impl RenderedDocument {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Single pass over `body`: values are inserted as-is and never rescanned,
/// so a value containing `{{...}}` stays literal text.
pub fn render(body: &str, resolved: &ResolvedValueMap) -> RenderedDocument {
    let mut missing: Vec<String> = Vec::new();

    let html = PLACEHOLDER_RE.replace_all(body, |caps: &Captures<'_>| {
        let name = &caps[1];
        match resolved.get(name) {
            Some(value) => markup_for(name, value),
            None if OPTIONAL_SIGNATURE_PLACEHOLDERS.contains(&name) => String::new(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    RenderedDocument {
        html: html.into_owned(),
        missing,
    }
}

fn markup_for(name: &str, value: &str) -> String {
    match name {
        LOGO_KEY if is_http_url(value) => format!(
            concat!(
                r#"<div style="text-align: center;">"#,
                r#"<img src="{}" alt="Logo" style="max-width: 200px; height: auto;" /></div>"#,
            ),
            escape_attr(value)
        ),
        SIGNATURE_KEY if is_data_image(value) || is_http_url(value) => format!(
            r#"<img src="{}" alt="Signature" style="max-width: 250px; height: auto;" />"#,
            escape_attr(value)
        ),
        _ => value.to_string(),
    }
}

fn is_http_url(value: &str) -> bool {
    let v = value.trim();
    let rest = v
        .strip_prefix("https://")
        .or_else(|| v.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

fn is_data_image(value: &str) -> bool {
    value.trim_start().starts_with("data:image/")
}

fn escape_attr(value: &str) -> String {
    value
        .trim()
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

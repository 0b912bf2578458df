//! Output formatting module.

mod json;
mod pretty;

use crate::cli::Args;
use crate::error::Result;
use serde_json::Value as JsonValue;

pub use json::format_json;
pub use pretty::format_pretty;

/// What a command produced, before it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A single line, e.g. hex output or a signature.
    Text(String),
    /// Labelled values.
    Fields(Vec<(&'static str, String)>),
    /// A JSON document.
    Document(JsonValue),
    /// Results of a wildcard query.
    Matches(Vec<JsonValue>),
    /// A transaction: `summary` is its decoded view, `wire` what gets
    /// emitted as JSON.
    Transaction { summary: JsonValue, wire: JsonValue },
}

impl Report {
    /// The JSON form of this report.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Report::Text(text) => JsonValue::String(text.clone()),
            Report::Fields(fields) => fields
                .iter()
                .map(|(k, v)| (k.to_string(), JsonValue::String(v.clone())))
                .collect::<serde_json::Map<_, _>>()
                .into(),
            Report::Document(doc) => doc.clone(),
            Report::Matches(items) => JsonValue::Array(items.clone()),
            Report::Transaction { wire, .. } => wire.clone(),
        }
    }
}

/// Format a report according to the output flags.
pub fn format_output(report: &Report, args: &Args) -> Result<String> {
    if args.json {
        format_json(report)
    } else {
        format_pretty(report, args)
    }
}

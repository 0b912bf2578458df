//! JSON output formatting.

use super::Report;
use crate::error::{Error, Result};

pub fn format_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(&report.to_json()).map_err(|e| Error::FormatError(e.to_string()))
}

//! Pretty terminal output with colors and tables.

use super::Report;
use crate::cli::Args;
use crate::error::{Error, Result};
use colored::Colorize;
use comfy_table::{Cell, ContentArrangement, Table, presets};
use serde_json::Value as JsonValue;

/// Format a report as pretty terminal output.
pub fn format_pretty(report: &Report, args: &Args) -> Result<String> {
    if args.no_color {
        colored::control::set_override(false);
    }

    match report {
        Report::Text(text) => Ok(text.clone()),
        Report::Fields(fields) => Ok(format_fields(fields)),
        Report::Document(doc) => format_value(doc),
        Report::Matches(items) => format_matches(items),
        Report::Transaction { summary, wire } => format_transaction(summary, wire),
    }
}

fn format_fields(fields: &[(&'static str, String)]) -> String {
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
    fields
        .iter()
        .map(|(label, value)| {
            format!(
                "{} {}",
                format!("{:<width$}", format!("{}:", label)).dimmed(),
                value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_value(value: &JsonValue) -> Result<String> {
    match value {
        JsonValue::Null => Ok("null".dimmed().to_string()),
        JsonValue::Bool(true) => Ok("true".green().to_string()),
        JsonValue::Bool(false) => Ok("false".red().to_string()),
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        _ => serde_json::to_string_pretty(value).map_err(|e| Error::FormatError(e.to_string())),
    }
}

fn format_matches(items: &[JsonValue]) -> Result<String> {
    let formatted: Result<Vec<String>> = items
        .iter()
        .enumerate()
        .map(|(idx, v)| Ok(format!("[{}] {}", idx.to_string().dimmed(), format_value(v)?)))
        .collect();

    Ok(formatted?.join("\n"))
}

/// Header, actions table and signatures of a transaction.
fn format_transaction(summary: &JsonValue, wire: &JsonValue) -> Result<String> {
    let mut output = String::new();
    let tx = summary.get("transaction").unwrap_or(summary);

    output.push_str(&format!("{}\n", "Transaction".bold().cyan()));
    if let Some(id) = summary.get("id").and_then(|v| v.as_str()) {
        output.push_str(&format!("  {} {}\n", "Id:".dimmed(), id.yellow()));
    }
    let header = [
        ("Expiration:", "expiration"),
        ("Ref block num:", "ref_block_num"),
        ("Ref block prefix:", "ref_block_prefix"),
        ("Delay (s):", "delay_sec"),
    ];
    for (label, key) in header {
        if let Some(value) = tx.get(key) {
            output.push_str(&format!("  {} {}\n", label.dimmed(), scalar(value)));
        }
    }
    output.push('\n');

    for (title, key) in [("Context-free actions", "context_free_actions"), ("Actions", "actions")] {
        let Some(actions) = tx.get(key).and_then(|v| v.as_array()) else {
            continue;
        };
        if actions.is_empty() && key == "context_free_actions" {
            continue;
        }
        output.push_str(&format!("{} ({})\n", title.bold().cyan(), actions.len()));
        output.push_str(&format_actions_table(actions));
        output.push('\n');
    }

    let signatures = summary
        .get("signatures")
        .or_else(|| wire.get("signatures"))
        .and_then(|v| v.as_array());
    match signatures {
        Some(sigs) if !sigs.is_empty() => {
            output.push_str(&format!("{} ({})\n", "Signatures".bold().cyan(), sigs.len()));
            for sig in sigs {
                output.push_str(&format!("  {}\n", scalar(sig)));
            }
        }
        _ => output.push_str(&format!("{} {}\n", "Signatures:".dimmed(), "none".red())),
    }

    if let Some(packed) = wire.get("packed_trx").and_then(|v| v.as_str()) {
        output.push_str(&format!("\n{}\n{}\n", "Packed".bold().cyan(), packed));
    }

    Ok(output.trim_end().to_string())
}

fn format_actions_table(actions: &[JsonValue]) -> String {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(comfy_table::Color::DarkGrey),
        Cell::new("Contract").fg(comfy_table::Color::DarkGrey),
        Cell::new("Action").fg(comfy_table::Color::DarkGrey),
        Cell::new("Authorization").fg(comfy_table::Color::DarkGrey),
        Cell::new("Data").fg(comfy_table::Color::DarkGrey),
    ]);

    for (idx, action) in actions.iter().enumerate() {
        let field = |key: &str| action.get(key).map(scalar).unwrap_or_else(|| "?".to_string());
        let authorization = action
            .get("authorization")
            .and_then(|v| v.as_array())
            .map(|levels| {
                levels
                    .iter()
                    .map(|level| {
                        let actor = level.get("actor").map(scalar).unwrap_or_default();
                        let permission = level.get("permission").map(scalar).unwrap_or_default();
                        format!("{}@{}", actor, permission)
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let data = action.get("data").and_then(|v| v.as_str()).unwrap_or("");

        table.add_row(vec![
            Cell::new(idx),
            Cell::new(field("account")),
            Cell::new(field("name")),
            Cell::new(authorization),
            Cell::new(truncate_hex(data, 32)),
        ]);
    }

    format!("{}\n", table)
}

fn scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shorten long hex, keeping both ends and the byte count.
fn truncate_hex(data: &str, max_len: usize) -> String {
    if data.is_empty() {
        return "-".to_string();
    }
    if data.len() <= max_len {
        return data.to_string();
    }
    let half = (max_len - 3) / 2;
    format!(
        "{}...{} ({} B)",
        &data[..half],
        &data[data.len() - half..],
        data.len() / 2
    )
}

// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports human-readable tables and JSON for scripting.

use crate::diagnostics::Diagnostics;
use crate::engine::{ContainerDescriptor, Document};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly text
    Normal,
    /// One JSON document per result
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Print a result: `human` renders it in normal mode, JSON otherwise.
    pub fn data<T: Serialize>(&self, value: &T, human: impl FnOnce(&T) -> String) {
        match self.mode {
            OutputMode::Normal => println!("{}", human(value)),
            OutputMode::Json => match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: failed to encode output: {e}"),
            },
        }
    }

    /// Print a success message (JSON mode wraps it in an event).
    pub fn success(&self, endpoint: &str, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("[{endpoint}] {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    endpoint: Some(endpoint),
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Error: {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    endpoint: None,
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Mention skipped endpoints on stderr (normal mode only; JSON carries them inline).
    pub fn failures(&self, diagnostics: &Diagnostics) {
        if self.mode != OutputMode::Normal {
            return;
        }
        for failure in diagnostics.failures() {
            eprintln!("warning: skipped {}: {}", failure.endpoint, failure.message);
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<&'a str>,
    message: &'a str,
}

/// Text produced by one endpoint, under an `[endpoint]` header line.
pub fn scoped_block(endpoint: &str, body: &str) -> String {
    let body = body.trim_end();
    if body.is_empty() {
        format!("[{endpoint}]")
    } else {
        format!("[{endpoint}]\n{body}")
    }
}

/// Render containers as an aligned table.
pub fn container_table(containers: &[ContainerDescriptor]) -> String {
    let mut rows = vec![vec![
        "ENDPOINT".to_string(),
        "CONTAINER ID".to_string(),
        "NAME".to_string(),
        "IMAGE".to_string(),
        "STATUS".to_string(),
        "PORTS".to_string(),
    ]];

    for c in containers {
        rows.push(vec![
            c.endpoint.clone().unwrap_or_default(),
            short_id(&c.id),
            c.name.clone(),
            c.image.clone(),
            c.status.clone(),
            c.ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ]);
    }

    render_table(&rows)
}

/// Render per-endpoint engine documents as a table of the given
/// `(title, key)` columns, prefixed by the endpoint name.
pub fn grouped_table(
    groups: &BTreeMap<String, Vec<Document>>,
    columns: &[(&str, &str)],
) -> String {
    let mut header = vec!["ENDPOINT".to_string()];
    header.extend(columns.iter().map(|(title, _)| title.to_string()));
    let mut rows = vec![header];

    for (endpoint, documents) in groups {
        for document in documents {
            let mut row = vec![endpoint.clone()];
            row.extend(columns.iter().map(|(_, key)| cell(key, document.get(*key))));
            rows.push(row);
        }
    }

    render_table(&rows)
}

fn cell(key: &str, value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if key == "Id" => short_id(s),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell(key, Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn short_id(id: &str) -> String {
    id.trim_start_matches("sha256:").chars().take(12).collect()
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

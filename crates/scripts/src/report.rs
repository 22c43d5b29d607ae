//! Diagnostic reporter: line-oriented reports built from pure reads and
//! logged at info level.
//!
//! Empty relation arrays print a placeholder instead of being dropped, so a
//! missing link is visible in the output.

use serde_json::Value;
use storefront_db::document::Document;

/// Placeholder for an empty relation in headline rows.
pub const NONE: &str = "NONE";

/// Placeholder for an empty relation in detail rows.
pub const NONE_DETAIL: &str = "None";

#[derive(Debug, Clone)]
pub struct Report {
    name: &'static str,
    lines: Vec<String>,
}

impl Report {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lines: Vec::new(),
        }
    }

    pub fn section(&mut self, title: &str) {
        self.lines.push(format!("--- {title} ---"));
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Log every line at info level, in order.
    pub fn emit(&self) {
        for line in &self.lines {
            tracing::info!(report = self.name, "{line}");
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Render a field for display: strings verbatim, missing or null as the
/// empty string, anything else as JSON.
pub fn scalar(doc: &Document, key: &str) -> String {
    match doc.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Nested records under `relation`, or nothing when the relation is absent.
pub fn related<'a>(doc: &'a Document, relation: &str) -> Vec<&'a Document> {
    doc.get(relation)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// `field` of every record under `relation`.
pub fn related_field(doc: &Document, relation: &str, field: &str) -> Vec<String> {
    related(doc, relation)
        .into_iter()
        .map(|r| scalar(r, field))
        .collect()
}

/// Comma-join `items`, or return `placeholder` when there are none.
pub fn join_or(items: &[String], placeholder: &str) -> String {
    if items.is_empty() {
        placeholder.to_string()
    } else {
        items.join(", ")
    }
}

/// The `rules` of a price as JSON, `{}` when it has none.
pub fn price_rules(price: &Document) -> String {
    price
        .get("rules")
        .filter(|r| !r.is_null())
        .map(Value::to_string)
        .unwrap_or_else(|| "{}".to_string())
}

//! Report template rendering with placeholder substitution.
//!
//! # Placeholders
//! - `{{date}}`, `{{time}}`, `{{datetime}}` - render time (UTC)
//! - `{{total}}` - number of scored authors
//! - `{{#scores}} ... {{/scores}}` - repeated per author, best score first,
//!   with `{{rank}}`, `{{email}}` and `{{score}}` available inside
//!
//! Values are HTML-escaped. Unknown placeholders are left untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::score::ScoreTable;

const BLOCK_OPEN: &str = "{{#scores}}";
const BLOCK_CLOSE: &str = "{{/scores}}";

/// Template structure errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// `{{#scores}}` without a matching `{{/scores}}`.
    #[error("Unterminated {{{{#scores}}}} block")]
    UnterminatedBlock,

    /// `{{/scores}}` without an opening tag.
    #[error("Unexpected {{{{/scores}}}} without matching {{{{#scores}}}}")]
    UnexpectedBlockEnd,
}

/// A report template loaded into memory.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    source: String,
}

impl ReportTemplate {
    /// Wraps template text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Reads `dir/name`.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read report template: {}", path.display()))?;
        Ok(Self::new(source))
    }

    /// Renders with the current time.
    pub fn render(&self, table: &ScoreTable) -> Result<String, TemplateError> {
        self.render_at(table, Utc::now())
    }

    /// Renders as of `now`.
    pub fn render_at(
        &self,
        table: &ScoreTable,
        now: DateTime<Utc>,
    ) -> Result<String, TemplateError> {
        let mut globals = BTreeMap::new();
        globals.insert("date", now.format("%Y-%m-%d").to_string());
        globals.insert("time", now.format("%H:%M:%S").to_string());
        globals.insert("datetime", now.format("%Y-%m-%d %H:%M:%S").to_string());
        globals.insert("total", table.len().to_string());

        let ranked = table.ranked();
        let mut output = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find(BLOCK_OPEN) {
            let before = &rest[..start];
            if before.contains(BLOCK_CLOSE) {
                return Err(TemplateError::UnexpectedBlockEnd);
            }
            output.push_str(&substitute(before, &globals));

            let after_open = &rest[start + BLOCK_OPEN.len()..];
            let end = after_open
                .find(BLOCK_CLOSE)
                .ok_or(TemplateError::UnterminatedBlock)?;
            let body = &after_open[..end];

            for (index, (email, score)) in ranked.iter().enumerate() {
                let mut vars = globals.clone();
                vars.insert("rank", (index + 1).to_string());
                vars.insert("email", (*email).to_string());
                vars.insert("score", score.to_string());
                output.push_str(&substitute(body, &vars));
            }

            rest = &after_open[end + BLOCK_CLOSE.len()..];
        }

        if rest.contains(BLOCK_CLOSE) {
            return Err(TemplateError::UnexpectedBlockEnd);
        }
        output.push_str(&substitute(rest, &globals));
        Ok(output)
    }
}

/// Replaces `{{name}}` (inner whitespace allowed) with escaped values.
fn substitute(text: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match vars.get(name) {
                    Some(value) => result.push_str(&escape_html(value)),
                    None => result.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

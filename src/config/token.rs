//! Placeholder substitution in configuration values.

use std::collections::BTreeMap;

use super::flatten::ConfigDocument;
use super::value::{ConfigValue, Scalar};

/// Token resolved to the directory holding the configuration file.
pub const APPLICATION_PATH: &str = "APPLICATION_PATH";

/// Replaces tokens inside string values.
#[derive(Debug, Clone, Default)]
pub struct TokenProcessor {
    tokens: BTreeMap<String, String>,
}

impl TokenProcessor {
    /// Creates a processor with no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token and the text that replaces it.
    pub fn with_token(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), value.into());
        self
    }

    /// Substitutes tokens in every string value of the document.
    pub fn process(&self, document: &mut ConfigDocument) {
        for value in document.values_mut() {
            self.process_value(value);
        }
    }

    fn process_value(&self, value: &mut ConfigValue) {
        match value {
            ConfigValue::Scalar(Scalar::String(text)) => {
                if let Some(replaced) = self.substitute(text) {
                    *text = replaced;
                }
            }
            ConfigValue::Scalar(_) => {}
            ConfigValue::List(items) => items.iter_mut().for_each(|item| self.process_value(item)),
            ConfigValue::Table(table) => table
                .values_mut()
                .for_each(|item| self.process_value(item)),
        }
    }

    /// Returns the substituted text, or `None` when no token occurs.
    fn substitute(&self, text: &str) -> Option<String> {
        let mut result: Option<String> = None;
        for (token, replacement) in &self.tokens {
            if token.is_empty() {
                continue;
            }
            let current = result.as_deref().unwrap_or(text);
            if current.contains(token.as_str()) {
                result = Some(current.replace(token.as_str(), replacement));
            }
        }
        result
    }
}

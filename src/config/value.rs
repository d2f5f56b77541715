//! Tagged configuration values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A scalar configuration leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// `~` or `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// Text.
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A configuration value: a scalar, an ordered list or a table of named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Leaf value.
    Scalar(Scalar),
    /// List-like node (sequence elements or index-keyed entries).
    List(Vec<ConfigValue>),
    /// Object-like node with named fields.
    Table(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Shorthand for a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }

    /// Shorthand for an integer scalar.
    pub fn integer(value: i64) -> Self {
        Self::Scalar(Scalar::Integer(value))
    }

    /// Converts a YAML node literally, keeping its nesting.
    pub fn from_yaml(value: &Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::integer(i),
                None => Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Self::string(s.clone()),
            Value::Sequence(items) => Self::List(items.iter().map(Self::from_yaml).collect()),
            Value::Mapping(map) => Self::Table(
                map.iter()
                    .map(|(k, v)| (key_text(k), Self::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// Returns true for lists and tables.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Table(_))
    }

    /// Returns the string content of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the textual form of any non-null scalar.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Scalar(Scalar::Null) | Self::List(_) | Self::Table(_) => None,
            Self::Scalar(scalar) => Some(scalar.to_string()),
        }
    }

    /// Merges `other` into `self`.
    ///
    /// Tables merge key-wise, lists concatenate; any other pairing yields
    /// `other`.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Table(mut ours), Self::Table(theirs)) => {
                for (key, incoming) in theirs {
                    let merged = match ours.remove(&key) {
                        Some(existing) => existing.merge_entry(incoming),
                        None => incoming,
                    };
                    ours.insert(key, merged);
                }
                Self::Table(ours)
            }
            (Self::List(mut ours), Self::List(theirs)) => {
                ours.extend(theirs);
                Self::List(ours)
            }
            (_, other) => other,
        }
    }

    /// Combines two values found under the same table key.
    fn merge_entry(self, other: Self) -> Self {
        match (self, other) {
            (ours @ Self::Table(_), theirs @ Self::Table(_))
            | (ours @ Self::List(_), theirs @ Self::List(_)) => ours.merge(theirs),
            (Self::Scalar(a), Self::Scalar(b)) => {
                Self::List(vec![Self::Scalar(a), Self::Scalar(b)])
            }
            (Self::Scalar(a), Self::List(mut items)) => {
                items.insert(0, Self::Scalar(a));
                Self::List(items)
            }
            (Self::List(mut items), Self::Scalar(b)) => {
                items.push(Self::Scalar(b));
                Self::List(items)
            }
            (_, other) => other,
        }
    }
}

/// Renders a YAML mapping key as a table key.
pub(crate) fn key_text(key: &Value) -> String {
    match key {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => key_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(key)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

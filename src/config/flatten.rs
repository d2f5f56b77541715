//! Flattening of nested YAML documents into underscore-joined keys.
//!
//! `data: {dir: /tmp}` becomes `data_dir = /tmp`. A list of scalars stays a
//! single list under its parent's key, and anything below the `.array` key is
//! kept as a literal nested value so that option tables (e.g. SMTP settings)
//! survive intact.

use std::collections::BTreeMap;
use std::fmt;

use serde_yaml::Value;

use super::value::{key_text, ConfigValue};

/// Key that stops path joining and keeps its subtree verbatim.
pub const ARRAY_SENTINEL: &str = ".array";

/// Separator placed between path segments.
pub const SEPARATOR: &str = "_";

/// Flat mapping from joined keys to values.
pub type ConfigDocument = BTreeMap<String, ConfigValue>;

/// One step of the path from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Name(String),
    Index(i64),
}

impl Segment {
    fn from_key(key: &Value) -> Self {
        match key {
            Value::Number(n) => n.as_i64().map_or_else(|| Self::Name(n.to_string()), Self::Index),
            Value::String(s) => match s.parse::<i64>() {
                Ok(index) if index.to_string() == *s => Self::Index(index),
                _ => Self::Name(s.clone()),
            },
            Value::Tagged(tagged) => Self::from_key(&tagged.value),
            other => Self::Name(key_text(other)),
        }
    }

    fn is_sentinel(&self) -> bool {
        matches!(self, Self::Name(name) if name == ARRAY_SENTINEL)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Flattens a parsed YAML document.
pub fn flatten(document: &Value) -> ConfigDocument {
    let mut flattener = Flattener::default();
    match strip_tags(document) {
        Value::Null => {}
        node @ (Value::Mapping(_) | Value::Sequence(_)) => {
            flattener.descend(node, &mut Vec::new());
        }
        scalar => flattener.store(String::new(), ConfigValue::from_yaml(scalar)),
    }
    flattener.document
}

/// Rebuilds nested tables by splitting keys on the separator.
///
/// Keys that themselves contain the separator cannot be told apart from
/// nested ones, so this only inverts [`flatten`] for documents without such
/// keys and without `.array` subtrees.
pub fn unflatten(document: &ConfigDocument) -> ConfigValue {
    let mut root = BTreeMap::new();
    for (key, value) in document {
        let parts: Vec<&str> = key.split(SEPARATOR).collect();
        insert_path(&mut root, &parts, value.clone());
    }
    ConfigValue::Table(root)
}

fn insert_path(table: &mut BTreeMap<String, ConfigValue>, parts: &[&str], value: ConfigValue) {
    match parts {
        [] => {}
        [last] => {
            table.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = table
                .entry((*head).to_string())
                .or_insert_with(|| ConfigValue::Table(BTreeMap::new()));
            if !matches!(child, ConfigValue::Table(_)) {
                *child = ConfigValue::Table(BTreeMap::new());
            }
            if let ConfigValue::Table(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[derive(Default)]
struct Flattener {
    document: ConfigDocument,
}

impl Flattener {
    fn descend(&mut self, node: &Value, path: &mut Vec<Segment>) {
        for (segment, child) in children(node) {
            let child = strip_tags(child);
            if segment.is_sentinel() {
                if !is_empty_collection(child) {
                    self.store(join(path), ConfigValue::from_yaml(child));
                }
                continue;
            }

            match (child, segment) {
                (Value::Mapping(_) | Value::Sequence(_), segment) => {
                    path.push(segment);
                    self.descend(child, path);
                    path.pop();
                }
                (leaf, Segment::Index(index)) => {
                    self.store_indexed(join(path), index, ConfigValue::from_yaml(leaf));
                }
                (leaf, segment @ Segment::Name(_)) => {
                    path.push(segment);
                    let key = join(path);
                    path.pop();
                    self.store(key, ConfigValue::from_yaml(leaf));
                }
            }
        }
    }

    /// Stores a value, merging when both sides are collections.
    fn store(&mut self, key: String, value: ConfigValue) {
        let merged = match self.document.remove(&key) {
            Some(existing) if existing.is_collection() && value.is_collection() => {
                existing.merge(value)
            }
            _ => value,
        };
        self.document.insert(key, merged);
    }

    /// Stores an index-keyed leaf under `key`.
    ///
    /// Values stay a list while indices are dense from zero. A gap or a
    /// negative index turns the list into a table keyed by index.
    fn store_indexed(&mut self, key: String, index: i64, value: ConfigValue) {
        let position = usize::try_from(index).ok();
        match self.document.get_mut(&key) {
            Some(ConfigValue::List(items)) => match position {
                Some(position) if position < items.len() => items[position] = value,
                Some(position) if position == items.len() => items.push(value),
                _ => {
                    let mut table = index_table(std::mem::take(items));
                    table.insert(index.to_string(), value);
                    self.document.insert(key, ConfigValue::Table(table));
                }
            },
            Some(ConfigValue::Table(table)) => {
                table.insert(index.to_string(), value);
            }
            _ if position == Some(0) => {
                self.document.insert(key, ConfigValue::List(vec![value]));
            }
            _ => {
                let table = BTreeMap::from([(index.to_string(), value)]);
                self.document.insert(key, ConfigValue::Table(table));
            }
        }
    }
}

fn children(node: &Value) -> Vec<(Segment, &Value)> {
    match node {
        Value::Mapping(map) => map
            .iter()
            .map(|(key, value)| (Segment::from_key(key), value))
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(index, value)| (Segment::Index(index as i64), value))
            .collect(),
        _ => Vec::new(),
    }
}

fn index_table(items: Vec<ConfigValue>) -> BTreeMap<String, ConfigValue> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item))
        .collect()
}

fn join(path: &[Segment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn strip_tags(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => strip_tags(&tagged.value),
        other => other,
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => map.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

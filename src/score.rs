//! Commit author scoring.
//!
//! A commit whose message follows the team convention (five word characters,
//! a hyphen, then anything, e.g. `PROJ1-fix login`) earns its author a
//! point; every other commit costs one.

pub mod record;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use record::{InputError, InputRecord, RecordReader};

/// Commit message convention: five ASCII word characters, a hyphen, anything.
pub const DEFAULT_PATTERN: &str = r"^(?-u:\w){5}-.*";

static COMMIT_CONVENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PATTERN).unwrap());

/// Errors raised while accumulating scores.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The input stream failed.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A score left the `i64` range.
    #[error("Score for '{identifier}' is out of range")]
    Overflow {
        /// Identifier whose score overflowed.
        identifier: String,
    },
}

/// Cumulative score per author identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    scores: BTreeMap<String, i64>,
}

impl ScoreTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the score of an identifier.
    pub fn get(&self, identifier: &str) -> Option<i64> {
        self.scores.get(identifier).copied()
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true when no identifier has a score.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterates over `(identifier, score)` in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.scores.iter().map(|(id, score)| (id.as_str(), *score))
    }

    /// Adds `delta` to an identifier's score, starting from zero, and returns
    /// the new score. The table is unchanged when the sum overflows.
    pub fn apply(&mut self, identifier: &str, delta: i64) -> Result<i64, ScoreError> {
        let current = self.get(identifier).unwrap_or(0);
        let score = current
            .checked_add(delta)
            .ok_or_else(|| ScoreError::Overflow {
                identifier: identifier.to_string(),
            })?;
        self.scores.insert(identifier.to_string(), score);
        Ok(score)
    }

    /// Entries ordered by score, highest first, ties by identifier.
    pub fn ranked(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| b.cmp(a).then_with(|| a_id.cmp(b_id)));
        entries
    }
}

impl FromIterator<(String, i64)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Decides whether a commit message earns or costs a point.
#[derive(Debug, Clone)]
pub struct ScoreRule {
    pattern: Regex,
}

impl Default for ScoreRule {
    fn default() -> Self {
        Self {
            pattern: COMMIT_CONVENTION.clone(),
        }
    }
}

impl ScoreRule {
    /// Builds a rule from a custom pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Returns the pattern source.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns true when the message follows the convention.
    pub fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }

    /// +1 for a matching message, -1 otherwise.
    pub fn delta(&self, message: &str) -> i64 {
        if self.matches(message) {
            1
        } else {
            -1
        }
    }
}

/// Counts gathered while accumulating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records processed.
    pub records: usize,
    /// Records whose message matched.
    pub matched: usize,
    /// Records whose message did not match.
    pub missed: usize,
}

/// Applies commit records to a score table.
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    rule: ScoreRule,
    table: ScoreTable,
    summary: RunSummary,
}

impl ScoreAccumulator {
    /// Starts from an existing table.
    pub fn new(rule: ScoreRule, table: ScoreTable) -> Self {
        Self {
            rule,
            table,
            summary: RunSummary::default(),
        }
    }

    /// Scores one record.
    pub fn apply(&mut self, record: &InputRecord) -> Result<i64, ScoreError> {
        let delta = self.rule.delta(&record.message);
        let score = self.table.apply(&record.identifier, delta)?;

        self.summary.records += 1;
        if delta > 0 {
            self.summary.matched += 1;
        } else {
            self.summary.missed += 1;
        }
        debug!(
            identifier = %record.identifier,
            delta,
            score,
            "Scored commit"
        );
        Ok(score)
    }

    /// Scores every record, stopping at the first error.
    pub fn apply_all<I>(&mut self, records: I) -> Result<RunSummary, ScoreError>
    where
        I: IntoIterator<Item = Result<InputRecord, InputError>>,
    {
        for record in records {
            self.apply(&record?)?;
        }
        info!(
            records = self.summary.records,
            matched = self.summary.matched,
            missed = self.summary.missed,
            authors = self.table.len(),
            "Accumulated scores"
        );
        Ok(self.summary)
    }

    /// Returns the current table.
    pub fn table(&self) -> &ScoreTable {
        &self.table
    }

    /// Returns the counts so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Consumes the accumulator, returning the table.
    pub fn into_table(self) -> ScoreTable {
        self.table
    }
}

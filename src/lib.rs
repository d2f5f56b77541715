//! # git-score
//!
//! Scores commit authors from `git log` output and emails a leaderboard.
//!
//! Each `identifier;message` record read from standard input earns its author
//! a point when the message follows the team convention (five word characters
//! and a hyphen, e.g. `PROJ1-fix login`) and costs one otherwise. Scores are
//! cumulative across runs and kept in a JSON file.
//!
//! ## Quick Start
//!
//! ```rust
//! use git_score::score::{InputRecord, ScoreAccumulator, ScoreRule, ScoreTable};
//!
//! let mut scores = ScoreAccumulator::new(ScoreRule::default(), ScoreTable::new());
//! scores.apply(&InputRecord::new("dev@example.com", "ABCDE-fix bug")).unwrap();
//! scores.apply(&InputRecord::new("dev@example.com", "wip")).unwrap();
//! assert_eq!(scores.table().get("dev@example.com"), Some(0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod report;
pub mod score;
pub mod store;

pub use crate::cli::Cli;

/// The current version of git-score.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

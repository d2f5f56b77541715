//! CLI interface for git-score.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::{AppConfig, ConfigError, DEFAULT_CONFIG_FILE};
use crate::report::{self, Mailer, ReportNotifier, SmtpMailer};
use crate::score::{RecordReader, ScoreAccumulator, ScoreRule, ScoreTable};
use crate::store::ScoreStore;

const LONG_ABOUT: &str = "\
Reads `identifier;message` records from standard input, awards +1 to each
author whose commit message matches the team convention (five word
characters, a hyphen, anything) and -1 otherwise, saves the cumulative
scores and emails an HTML report.

Example:
  git log --format='%ae;%s' origin/main@{1}..origin/main | git-score";

/// git-score: scores commit authors from git log output.
#[derive(Parser)]
#[command(name = "git-score")]
#[command(about = "Score points from git log", long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Configuration file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "GIT_SCORE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Prints the rendered report instead of saving scores and sending it.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Executes the CLI command.
    pub fn execute(self) -> Result<()> {
        let config = AppConfig::load(&self.config)?;
        let stdin = io::stdin();

        if self.dry_run {
            dry_run(&config, stdin.lock(), io::stdout().lock())?;
            return Ok(());
        }

        run(&config, stdin.lock(), |config| {
            SmtpMailer::from_options(&config.smtp()?)
        })?;
        Ok(())
    }
}

/// Loads scores, applies every input record, saves and mails the result.
///
/// `connect` is only called once the scores are saved, so a broken mail
/// setup never loses a run.
pub fn run<R, M, F>(config: &AppConfig, input: R, connect: F) -> Result<ScoreTable>
where
    R: BufRead,
    M: Mailer,
    F: FnOnce(&AppConfig) -> Result<M>,
{
    let store = ScoreStore::new(config.data_path()?);
    let table = accumulate(config, &store, input)?;

    store.save(&table)?;
    info!(path = %store.path().display(), authors = table.len(), "Scores saved");

    let mailer = connect(config)?;
    ReportNotifier::new(config, mailer).send(&table)?;
    Ok(table)
}

/// Scores the input against the stored table and writes the rendered report
/// to `out`. Nothing is saved and nothing is sent.
pub fn dry_run<R, W>(config: &AppConfig, input: R, mut out: W) -> Result<ScoreTable>
where
    R: BufRead,
    W: Write,
{
    let store = ScoreStore::new(config.data_path()?);
    let table = accumulate(config, &store, input)?;
    let html = report::render(config, &table)?;

    writeln!(out, "{html}").context("Failed to write report")?;
    Ok(table)
}

/// Loads the stored table and applies every input record to it.
pub fn accumulate<R: BufRead>(
    config: &AppConfig,
    store: &ScoreStore,
    input: R,
) -> Result<ScoreTable> {
    let rule = match config.score_pattern()? {
        Some(pattern) => {
            ScoreRule::new(&pattern).map_err(|e| ConfigError::invalid("score_pattern", e))?
        }
        None => ScoreRule::default(),
    };

    let mut accumulator = ScoreAccumulator::new(rule, store.load()?);
    accumulator
        .apply_all(RecordReader::new(input))
        .context("Failed to score commit records")?;
    Ok(accumulator.into_table())
}

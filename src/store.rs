//! Score table persistence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::score::ScoreTable;

/// Loads and saves the score table as a JSON object.
#[derive(Debug, Clone)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    /// Creates a store for the file at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the score file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored table.
    ///
    /// A missing, unreadable or corrupt file means no scores yet. Corrupt
    /// content is logged at `warn` and replaced on the next save.
    pub fn load(&self) -> Result<ScoreTable> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                debug!(
                    path = %self.path.display(),
                    error = %err,
                    "Score file not readable, starting empty"
                );
                return Ok(ScoreTable::new());
            }
        };

        let table: ScoreTable = match serde_json::from_str(&content) {
            Ok(table) => table,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Score file is not a JSON object of scores, starting empty"
                );
                return Ok(ScoreTable::new());
            }
        };
        debug!(path = %self.path.display(), authors = table.len(), "Loaded scores");
        Ok(table)
    }

    /// Writes the table, replacing any previous content.
    pub fn save(&self, table: &ScoreTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_data_dir(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }

        let content = serde_json::to_string(table).context("Failed to serialize scores")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write score file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), authors = table.len(), "Saved scores");
        Ok(())
    }
}

#[cfg(unix)]
fn create_data_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
}

#[cfg(not(unix))]
fn create_data_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

//! Configuration loaded from a YAML file and flattened into underscore keys.

mod error;
pub mod flatten;
pub mod smtp;
pub mod token;
mod value;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub use error::ConfigError;
pub use flatten::{flatten, unflatten, ConfigDocument, ARRAY_SENTINEL};
pub use smtp::{ConnectionClass, ConnectionConfig, SmtpOptions, SslMode};
pub use token::{TokenProcessor, APPLICATION_PATH};
pub use value::{ConfigValue, Scalar};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Template used when `template_name` is not set.
pub const DEFAULT_TEMPLATE_NAME: &str = "email/scores.html";

/// Application configuration.
///
/// Built once at startup and passed to every component. Keys are only
/// checked when read, so a missing key fails the step that needs it.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    document: ConfigDocument,
}

impl AppConfig {
    /// Loads and flattens the configuration file at `path`.
    ///
    /// `APPLICATION_PATH` in string values resolves to the directory holding
    /// the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let application_path = application_path(path);
        debug!(
            config = %path.display(),
            application_path = %application_path.display(),
            "Loading configuration"
        );

        Self::from_yaml_str(&content, &application_path)
            .with_context(|| format!("Failed to load configuration file: {}", path.display()))
    }

    /// Parses and flattens YAML content.
    pub fn from_yaml_str(content: &str, application_path: &Path) -> Result<Self> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(content).context("Failed to parse configuration YAML")?;

        let mut document = flatten(&raw);
        TokenProcessor::new()
            .with_token(APPLICATION_PATH, application_path.to_string_lossy())
            .process(&mut document);

        debug!(keys = document.len(), "Flattened configuration");
        Ok(Self::from_document(document))
    }

    /// Wraps an already flattened document.
    pub fn from_document(document: ConfigDocument) -> Self {
        Self { document }
    }

    /// Returns the flattened document.
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Returns the value stored under a flattened key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self.document.get(key) {
            Some(ConfigValue::Scalar(Scalar::Null)) | None => None,
            Some(value) => Some(value),
        }
    }

    fn require(&self, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    fn text(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.get(key)
            .map(|value| {
                value
                    .as_text()
                    .ok_or_else(|| ConfigError::invalid(key, "expected a scalar value"))
            })
            .transpose()
    }

    fn require_text(&self, key: &str) -> Result<String, ConfigError> {
        self.text(key)?
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Directory holding the score file.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        self.require_text("data_dir").map(PathBuf::from)
    }

    /// Name of the score file inside [`Self::data_dir`].
    pub fn data_filename(&self) -> Result<String, ConfigError> {
        self.require_text("data_filename")
    }

    /// Full path of the score file.
    pub fn data_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(self.data_filename()?))
    }

    /// Report subject line.
    pub fn email_subject(&self) -> Result<String, ConfigError> {
        self.require_text("email_subject")
    }

    /// Report sender address.
    pub fn email_sender(&self) -> Result<String, ConfigError> {
        self.require_text("email_sender")
    }

    /// Report recipients; a single address or a list.
    pub fn email_to(&self) -> Result<Vec<String>, ConfigError> {
        const KEY: &str = "email_to";
        match self.require(KEY)? {
            ConfigValue::List(items) => {
                let recipients = items
                    .iter()
                    .map(|item| {
                        item.as_text().ok_or_else(|| {
                            ConfigError::invalid(KEY, "expected a list of addresses")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if recipients.is_empty() {
                    return Err(ConfigError::MissingKey(KEY.to_string()));
                }
                Ok(recipients)
            }
            value => value
                .as_text()
                .map(|address| vec![address])
                .ok_or_else(|| ConfigError::invalid(KEY, "expected an address")),
        }
    }

    /// Directory the report template is loaded from.
    pub fn template_dir(&self) -> Result<PathBuf, ConfigError> {
        self.require_text("template_dir").map(PathBuf::from)
    }

    /// Template path relative to [`Self::template_dir`].
    pub fn template_name(&self) -> Result<String, ConfigError> {
        Ok(self
            .text("template_name")?
            .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string()))
    }

    /// SMTP transport options.
    pub fn smtp(&self) -> Result<SmtpOptions, ConfigError> {
        const KEY: &str = "smtp";
        let value = self.require(KEY)?;
        if !matches!(value, ConfigValue::Table(_)) {
            return Err(ConfigError::invalid(KEY, "expected a table of SMTP options"));
        }
        let json = serde_json::to_value(value).map_err(|e| ConfigError::invalid(KEY, e))?;
        serde_json::from_value(json).map_err(|e| ConfigError::invalid(KEY, e))
    }

    /// Optional override of the commit message pattern.
    pub fn score_pattern(&self) -> Result<Option<String>, ConfigError> {
        self.text("score_pattern")
    }
}

/// Directory substituted for `APPLICATION_PATH`.
fn application_path(config_path: &Path) -> PathBuf {
    let parent = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parent.canonicalize().unwrap_or(parent)
}

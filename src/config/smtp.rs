//! SMTP connection options.

use serde::{Deserialize, Serialize};

/// SMTP transport settings, usually kept under `smtp: {.array: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SmtpOptions {
    /// Name announced in EHLO.
    #[serde(default = "default_name")]
    pub name: String,

    /// Server host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Authentication mechanism.
    #[serde(default)]
    pub connection_class: ConnectionClass,

    /// Credentials and encryption.
    #[serde(default)]
    pub connection_config: ConnectionConfig,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            connection_class: ConnectionClass::default(),
            connection_config: ConnectionConfig::default(),
        }
    }
}

fn default_name() -> String {
    "localhost".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    25
}

/// How the client authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionClass {
    /// No authentication.
    #[default]
    Smtp,
    /// AUTH PLAIN.
    Plain,
    /// AUTH LOGIN.
    Login,
}

/// Credentials and transport security.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Account name.
    #[serde(default)]
    pub username: Option<String>,

    /// Account password.
    #[serde(default)]
    pub password: Option<String>,

    /// Transport encryption, plaintext when absent.
    #[serde(default)]
    pub ssl: Option<SslMode>,
}

/// Transport encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Implicit TLS from the first byte.
    Ssl,
    /// STARTTLS upgrade.
    Tls,
}

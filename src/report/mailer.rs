//! Mail delivery.

use anyhow::{bail, Context, Result};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::config::{ConnectionClass, SmtpOptions, SslMode};

/// Sends a composed message.
pub trait Mailer {
    /// Delivers the message. Failures are not retried.
    fn send(&self, message: &Message) -> Result<()>;
}

impl<M: Mailer + ?Sized> Mailer for &M {
    fn send(&self, message: &Message) -> Result<()> {
        (**self).send(message)
    }
}

/// Synchronous SMTP delivery.
pub struct SmtpMailer {
    transport: SmtpTransport,
    server: String,
}

impl SmtpMailer {
    /// Builds the transport from configured options.
    pub fn from_options(options: &SmtpOptions) -> Result<Self> {
        let mut builder = SmtpTransport::builder_dangerous(options.host.as_str())
            .port(options.port)
            .hello_name(ClientId::Domain(options.name.clone()));

        if let Some(ssl) = options.connection_config.ssl {
            let parameters = TlsParameters::new(options.host.clone())
                .with_context(|| format!("Failed to set up TLS for {}", options.host))?;
            builder = builder.tls(match ssl {
                SslMode::Ssl => Tls::Wrapper(parameters),
                SslMode::Tls => Tls::Required(parameters),
            });
        }

        let mechanism = match options.connection_class {
            ConnectionClass::Smtp => None,
            ConnectionClass::Plain => Some(Mechanism::Plain),
            ConnectionClass::Login => Some(Mechanism::Login),
        };
        if let Some(mechanism) = mechanism {
            let config = &options.connection_config;
            let (Some(username), Some(password)) = (&config.username, &config.password) else {
                bail!(
                    "SMTP connection_class {:?} requires connection_config username and password",
                    options.connection_class
                );
            };
            builder = builder
                .credentials(Credentials::new(username.clone(), password.clone()))
                .authentication(vec![mechanism]);
        }

        let server = format!("{}:{}", options.host, options.port);
        debug!(server = %server, class = ?options.connection_class, "Configured SMTP transport");
        Ok(Self {
            transport: builder.build(),
            server,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &Message) -> Result<()> {
        let response = self
            .transport
            .send(message)
            .with_context(|| format!("Failed to send report via {}", self.server))?;
        info!(server = %self.server, code = %response.code(), "Report sent");
        Ok(())
    }
}

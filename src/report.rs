//! Score report rendering and delivery.

pub mod mailer;
pub mod template;

use anyhow::{Context, Result};
use lettre::message::{Mailbox, SinglePart};
use lettre::Message;
use tracing::debug;

use crate::config::AppConfig;
use crate::score::ScoreTable;

pub use mailer::{Mailer, SmtpMailer};
pub use template::{ReportTemplate, TemplateError};

/// Renders the score table and mails it to the configured recipients.
pub struct ReportNotifier<'a, M> {
    config: &'a AppConfig,
    mailer: M,
}

impl<'a, M: Mailer> ReportNotifier<'a, M> {
    /// Creates a notifier; configuration is read when a report is built.
    pub fn new(config: &'a AppConfig, mailer: M) -> Self {
        Self { config, mailer }
    }

    /// Renders the configured template.
    pub fn render(&self, table: &ScoreTable) -> Result<String> {
        render(self.config, table)
    }

    /// Builds the HTML message for a table.
    pub fn compose(&self, table: &ScoreTable) -> Result<Message> {
        let html = self.render(table)?;

        let sender = self.config.email_sender()?;
        let from: Mailbox = sender
            .parse()
            .with_context(|| format!("Invalid sender address: {sender}"))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(self.config.email_subject()?);
        for recipient in self.config.email_to()? {
            let to: Mailbox = recipient
                .parse()
                .with_context(|| format!("Invalid recipient address: {recipient}"))?;
            builder = builder.to(to);
        }

        builder
            .singlepart(SinglePart::html(html))
            .context("Failed to build report email")
    }

    /// Renders, composes and sends the report.
    pub fn send(&self, table: &ScoreTable) -> Result<()> {
        let message = self.compose(table)?;
        debug!(authors = table.len(), "Sending report");
        self.mailer.send(&message)
    }
}

/// Renders the configured template without sending anything.
pub fn render(config: &AppConfig, table: &ScoreTable) -> Result<String> {
    let template_dir = config.template_dir()?;
    let template_name = config.template_name()?;
    let template = ReportTemplate::load(&template_dir, &template_name)?;
    template
        .render(table)
        .with_context(|| format!("Failed to render report template: {template_name}"))
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{error, info};

use crate::config::EmailConfig;
use crate::services::{Mailer, OperationResult};

/// SMTP mailer using STARTTLS and login credentials from the config.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = from
            .parse()
            .with_context(|| format!("Invalid sender address: {}", from))?;
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", to))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .context("Failed to build email message")
    }

    async fn try_send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let host = self
            .config
            .host
            .as_deref()
            .context("Email host is not configured")?;
        let user = self
            .config
            .user
            .as_deref()
            .context("Email user is not configured")?;
        let password = self
            .config
            .password
            .as_deref()
            .context("Email password is not configured")?;

        let message = self.build_message(user, to, subject, body)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("Failed to configure SMTP relay: {}", host))?
            .port(self.config.port)
            .credentials(Credentials::new(user.to_string(), password.to_string()));
        if let Some(secs) = self.config.timeout_secs {
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }
        let transport = builder.build();

        transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> OperationResult {
        info!("Sending email to {}", to);
        match self.try_send(to, subject, body).await {
            Ok(()) => OperationResult::success("Email sent successfully."),
            Err(e) => {
                error!("Error sending email: {:#}", e);
                OperationResult::failure("Email error", &e)
            }
        }
    }
}

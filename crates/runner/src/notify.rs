//! Completion email via SMTP (PRD-1).
//!
//! [`Notifier`] wraps the `lettre` async SMTP transport to mail the
//! rendered run summary once a range fully completes. Entirely disabled
//! when `SMTP_HOST` is unset; a half-configured notifier is a startup
//! error rather than a silent skip, since the whole point is telling an
//! absent operator their overnight run finished.

use retake_engine::RunSummary;

use crate::config::{optional_var, parsed_var, required_var, ConfigError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Email delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// NotifierConfig
// ---------------------------------------------------------------------------

/// Default SMTP submission port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP settings for the completion email.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// Optional SMTP username.
    pub username: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Recipient of the completion email.
    pub recipient: String,
}

impl NotifierConfig {
    /// Load SMTP settings from environment variables.
    ///
    /// Returns `Ok(None)` when `SMTP_HOST` is unset, meaning notification
    /// is not configured and should be skipped. When the host is set, the
    /// sender and recipient become required.
    ///
    /// | Variable        | Required              | Default |
    /// |-----------------|-----------------------|---------|
    /// | `SMTP_HOST`     | no (gates the rest)   | unset   |
    /// | `SMTP_PORT`     | no                    | `587`   |
    /// | `SMTP_USERNAME` | no                    | unset   |
    /// | `SMTP_PASSWORD` | no                    | unset   |
    /// | `SMTP_FROM`     | if `SMTP_HOST` is set | --      |
    /// | `NOTIFY_EMAIL`  | if `SMTP_HOST` is set | --      |
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = optional_var("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parsed_var("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username: optional_var("SMTP_USERNAME"),
            password: optional_var("SMTP_PASSWORD"),
            from_address: required_var("SMTP_FROM")?,
            recipient: required_var("NOTIFY_EMAIL")?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Sends the completion email for a finished run.
pub struct Notifier {
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config }
    }

    /// Mail the rendered summary block to the configured recipient.
    pub async fn send_run_summary(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let subject = format!(
            "[retake] Scene production finished: {}/{} succeeded",
            summary.successful,
            summary.total_in_range()
        );

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(self.config.recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(summary.render())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = %self.config.recipient, "Completion email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

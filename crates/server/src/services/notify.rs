//! Outbound email.
//!
//! The [`NotificationDispatcher`] hands each message to a detached task so
//! that the request that produced it never waits on (or fails because of)
//! delivery. Tasks are tracked only so shutdown can drain them.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio_util::task::TaskTracker;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// A single outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// The one-time code email sent at registration and on re-send.
    #[must_use]
    pub fn verification_code(to: &str, code: &str) -> Self {
        Self {
            to: to.to_owned(),
            subject: "Your Instashop verification code".to_owned(),
            body: format!(
                "Your verification code is {code}. It expires soon and can be used once."
            ),
        }
    }
}

/// A delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// SMTP delivery via a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(notification
                .to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(notification.to.clone()))?)
            .subject(&notification.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Logs messages instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "Email not sent (SMTP disabled)"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery on tracked background tasks.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    tracker: TaskTracker,
}

impl NotificationDispatcher {
    /// Dispatch through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            tracker: TaskTracker::new(),
        }
    }

    /// Send `notification` on a detached task and return immediately.
    ///
    /// The outcome is only logged; callers never observe it.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        self.tracker.spawn(async move {
            match notifier.send(&notification).await {
                Ok(()) => tracing::info!(
                    to = %notification.to,
                    subject = %notification.subject,
                    "Email sent successfully"
                ),
                Err(e) => tracing::warn!(
                    to = %notification.to,
                    error = %e,
                    "Could not send email"
                ),
            }
        });
    }

    /// Stop accepting tracked work and wait for in-flight sends. Call once at shutdown.
    pub async fn close_and_wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

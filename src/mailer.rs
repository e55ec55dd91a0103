use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::config::SmtpConfig;
use crate::error::{DeliveryError, RelayError};
use crate::models::{EmailRequest, MailJob};

/// Outbound mail transport. The worker calls it for one message at a time.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: &EmailRequest) -> Result<(), DeliveryError>;
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailTransport {
    // Implicit TLS relay, the usual setup for port 465
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e| DeliveryError::Address(format!("{}: {}", config.sender, e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, sender })
    }
}

pub fn build_message(sender: &Mailbox, email: &EmailRequest) -> Result<Message, DeliveryError> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| DeliveryError::Address(format!("{}: {}", email.to, e)))?;

    Message::builder()
        .from(sender.clone())
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, email: &EmailRequest) -> Result<(), DeliveryError> {
        let message = build_message(&self.sender, email)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Smtp(e.to_string()))
    }
}

// Used when SMTP credentials are missing; the relay keeps running without mail
pub struct UnconfiguredTransport;

#[async_trait]
impl MailTransport for UnconfiguredTransport {
    async fn deliver(&self, _email: &EmailRequest) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotConfigured)
    }
}

/// Handle for queueing mail to the dispatcher worker.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::Sender<MailJob>,
}

impl Mailer {
    pub fn new(tx: mpsc::Sender<MailJob>) -> Self {
        Self { tx }
    }

    /// Queue the email and return without waiting for delivery.
    ///
    /// Never waits on the worker: a full queue is reported as
    /// [`RelayError::QueueFull`] instead of blocking the caller.
    pub fn schedule(&self, email: EmailRequest) -> Result<(), RelayError> {
        self.tx
            .try_send(MailJob {
                email,
                reply_tx: None,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => RelayError::QueueFull,
                TrySendError::Closed(_) => RelayError::QueueClosed,
            })
    }

    /// Queue the email and wait for the worker to report the outcome.
    pub async fn send(&self, email: EmailRequest) -> Result<(), RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MailJob {
                email,
                reply_tx: Some(reply_tx),
            })
            .await
            .map_err(|_| RelayError::QueueClosed)?;

        reply_rx
            .await
            .map_err(|_| RelayError::QueueClosed)?
            .map_err(RelayError::Delivery)
    }
}

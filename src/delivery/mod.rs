//! Delivery: build the MIME message and submit it through the relay.
//!
//! [`Mailer::deliver`] never fails. Every error is logged and folded into a
//! [`DeliveryResult`] with `status: error`.

pub mod message;
pub mod relay;

pub use message::OutboundEmail;
pub use relay::{RelayConnection, RelayConnector, SmtpRelay, SmtpSettings};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::DeliveryError;

/// Outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Error,
}

/// JSON body returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub message: String,
}

impl DeliveryResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// Sends cover emails, one fresh relay connection per call.
#[derive(Clone)]
pub struct Mailer {
    relay: Arc<dyn RelayConnector>,
    timeout: Duration,
}

impl Mailer {
    pub fn new(relay: Arc<dyn RelayConnector>, timeout: Duration) -> Self {
        Self { relay, timeout }
    }

    pub async fn deliver(&self, email: OutboundEmail) -> DeliveryResult {
        let recipient = email.to().to_string();
        match self.try_deliver(&email).await {
            Ok(()) => {
                info!(recipient = %recipient, subject = email.subject(), "Email sent");
                DeliveryResult::success(format!("Email sent to {recipient}"))
            }
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Error sending email");
                DeliveryResult::error(e.to_string())
            }
        }
    }

    async fn try_deliver(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        let message = email.to_message()?;
        let envelope = message.envelope().clone();
        let raw = message.formatted();
        let relay = Arc::clone(&self.relay);
        let budget = self.timeout;

        // Awaited to completion: the outcome reported is the outcome of the
        // exchange. The budget and the socket timeout bound how long it runs.
        tokio::task::spawn_blocking(move || {
            relay::transmit(relay.as_ref(), &envelope, &raw, budget)
        })
        .await
        .map_err(|e| DeliveryError::Task(e.to_string()))?
    }
}

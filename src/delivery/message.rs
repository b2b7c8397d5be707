//! Outbound email construction.

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};

use crate::draft::DraftContent;
use crate::error::DeliveryError;
use crate::request::{EmailAddress, Upload};

/// Media type of every attachment this service sends.
pub const ATTACHMENT_MEDIA_TYPE: &str = "application/pdf";

/// A fully assembled cover email. Immutable once built.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    from: Mailbox,
    to: EmailAddress,
    subject: String,
    body: String,
    attachment: Upload,
}

impl OutboundEmail {
    pub fn new(from: Mailbox, to: EmailAddress, draft: DraftContent, attachment: Upload) -> Self {
        Self {
            from,
            to,
            subject: draft.subject,
            body: draft.body,
            attachment,
        }
    }

    pub fn to(&self) -> &EmailAddress {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Render as a `multipart/mixed` message: plain-text body, PDF attachment.
    pub fn to_message(&self) -> Result<Message, DeliveryError> {
        let to: Mailbox = self
            .to
            .as_str()
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::InvalidAddress {
                address: self.to.to_string(),
                reason: e.to_string(),
            })?;

        let content_type = ContentType::parse(ATTACHMENT_MEDIA_TYPE)
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        let attachment = Attachment::new(self.attachment.filename.clone())
            .body(self.attachment.bytes.clone(), content_type);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&self.subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

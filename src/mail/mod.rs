//! Outbound email.
//!
//! Handlers build an [`Email`] and hand it to a background task, which calls
//! [`Mailer::send`]. Sending blocks, so it must never run on the request path.

mod compose;
mod logging;
mod smtp;

pub use compose::{contact_email, example_email};
pub use logging::LogMailer;
pub use smtp::SmtpMailer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {0:?}: {1}")]
    Address(String, #[source] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to render email: {0}")]
    Render(#[from] askama::Error),

    #[error("invalid content type {0:?}")]
    ContentType(String),
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Attachment typed as `application/octet-stream`.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/octet-stream".to_string(),
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Mailbox, either `user@host` or `Name <user@host>`.
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl Email {
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Delivers messages. Implementations block until delivery finishes.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &Email) -> Result<(), MailError>;
}

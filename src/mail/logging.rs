use super::{Email, MailError, Mailer};

/// Logs messages instead of sending them. Used when sending is disabled.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Mailer for LogMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        let attachments: Vec<&str> = email
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect();

        tracing::info!(
            to = %email.to,
            reply_to = email.reply_to.as_deref().unwrap_or(""),
            subject = %email.subject,
            attachments = ?attachments,
            "send email"
        );
        tracing::debug!(body = %email.text_body, "email body");
        Ok(())
    }
}

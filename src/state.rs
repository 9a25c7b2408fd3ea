//! Application state shared by every handler.

use std::sync::Arc;

use crate::auth::Credentials;
use crate::mail::Mailer;
use crate::tasks::BackgroundTasks;

/// Process-wide, read-only after startup apart from the task counter.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<Credentials>,
    pub mailer: Arc<dyn Mailer>,
    pub tasks: BackgroundTasks,
    pub dev_mode: bool,
    /// Mailbox that receives contact-form submissions.
    pub contact_recipient: String,
}

impl AppState {
    pub fn new(
        credentials: Credentials,
        mailer: Arc<dyn Mailer>,
        dev_mode: bool,
        contact_recipient: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            mailer,
            tasks: BackgroundTasks::new(),
            dev_mode,
            contact_recipient: contact_recipient.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(email: &str, password_hash: &str) -> Self {
        let credentials =
            Credentials::new(email, password_hash).expect("test hash is a valid PHC string");
        Self::new(
            credentials,
            Arc::new(crate::mail::LogMailer::new()),
            false,
            "Recipient <recipient@example.com>",
        )
    }
}

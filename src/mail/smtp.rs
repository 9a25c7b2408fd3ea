use std::thread;
use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::{Credentials, Mechanism},
    Message, SmtpTransport, Transport,
};

use super::{Email, MailError, Mailer};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);
const SEND_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
    ) -> Result<Self, MailError> {
        let from = parse_mailbox(from)?;
        let builder = if port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(host)?
        } else {
            SmtpTransport::starttls_relay(host)?
        };
        let transport = builder
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .authentication(vec![Mechanism::Login])
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        build_message(&self.from, email)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        let mut attempt = 1;
        loop {
            match self.transport.send(&message) {
                Ok(_) => return Ok(()),
                Err(err) if attempt < SEND_ATTEMPTS => {
                    tracing::warn!(attempt, error = %err, to = %email.to, "smtp send failed, retrying");
                    thread::sleep(RETRY_BACKOFF);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn parse_mailbox(value: &str) -> Result<Mailbox, MailError> {
    value
        .parse()
        .map_err(|err| MailError::Address(value.to_string(), err))
}

fn build_message(from: &Mailbox, email: &Email) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.as_str());
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    let body = match &email.html_body {
        Some(html) => MultiPart::alternative_plain_html(email.text_body.clone(), html.clone()),
        None => MultiPart::mixed().singlepart(SinglePart::plain(email.text_body.clone())),
    };

    if email.attachments.is_empty() {
        return Ok(builder.multipart(body)?);
    }

    let mut mixed = MultiPart::mixed().multipart(body);
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|_| MailError::ContentType(attachment.content_type.clone()))?;
        mixed = mixed.singlepart(
            lettre::message::Attachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type),
        );
    }
    Ok(builder.multipart(mixed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Attachment;

    fn email() -> Email {
        Email {
            to: "Recipient <recipient@example.com>".into(),
            reply_to: Some("sender@example.com".into()),
            subject: "Hello".into(),
            text_body: "plain body".into(),
            html_body: Some("<p>html body</p>".into()),
            attachments: Vec::new(),
        }
    }

    fn from() -> Mailbox {
        parse_mailbox("Webstart <noreply@example.com>").unwrap()
    }

    #[test]
    fn test_rejects_bad_sender() {
        let result = SmtpMailer::new("localhost", 25, "user", "pass", "not an address");
        assert!(matches!(result, Err(MailError::Address(_, _))));
    }

    #[test]
    fn test_builds_alternative_message() {
        let message = build_message(&from(), &email()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Reply-To: sender@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("plain body"));
        assert!(raw.contains("<p>html body</p>"));
    }

    #[test]
    fn test_builds_message_with_attachment() {
        let email = email().attach(
            Attachment::new("report.csv", b"a,b\n1,2\n".to_vec()).with_content_type("text/csv"),
        );
        let message = build_message(&from(), &email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("report.csv"));
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let mut email = email();
        email.to = "nobody".into();
        assert!(matches!(
            build_message(&from(), &email),
            Err(MailError::Address(addr, _)) if addr == "nobody"
        ));
    }

    #[test]
    fn test_rejects_bad_attachment_type() {
        let email = email().attach(Attachment::new("x", vec![1]).with_content_type("not a type"));
        assert!(matches!(
            build_message(&from(), &email),
            Err(MailError::ContentType(_))
        ));
    }
}

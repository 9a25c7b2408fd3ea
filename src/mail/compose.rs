//! Rendered messages sent by the app.

use askama::Template;

use super::{Email, MailError};

#[derive(Template)]
#[template(path = "emails/contact.txt")]
struct ContactText<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "emails/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "emails/example.txt")]
struct ExampleText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "emails/example.html")]
struct ExampleHtml<'a> {
    name: &'a str,
}

/// A contact-form submission. Replies go to the submitter.
pub fn contact_email(to: &str, name: &str, email: &str, message: &str) -> Result<Email, MailError> {
    Ok(Email {
        to: to.to_string(),
        reply_to: Some(email.to_string()),
        subject: format!("Contact form message from {name}"),
        text_body: ContactText { name, email, message }.render()?,
        html_body: Some(ContactHtml { name, email, message }.render()?),
        attachments: Vec::new(),
    })
}

/// The demo message queued by `/send-mail/`.
pub fn example_email(to: &str, name: &str) -> Result<Email, MailError> {
    Ok(Email {
        to: to.to_string(),
        reply_to: None,
        subject: "Example email".to_string(),
        text_body: ExampleText { name }.render()?,
        html_body: Some(ExampleHtml { name }.render()?),
        attachments: Vec::new(),
    })
}

//! Contact form.

use std::sync::Arc;

use askama::Template;
use axum::{extract::State, http::StatusCode, response::Response, Form};
use serde::Deserialize;

use crate::error::AppError;
use crate::filters;
use crate::mail::{self, MailError};
use crate::state::AppState;
use crate::validation::{self, Validator};
use crate::view::{render, Page, PageData};

const MAX_NAME_CHARS: usize = 100;
const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.check(validation::not_blank(&self.name), "name", "Name is required.");
        v.check(
            validation::max_chars(&self.name, MAX_NAME_CHARS),
            "name",
            "Name must be less than 100 characters.",
        );
        v.check(validation::not_blank(&self.email), "email", "Email is required.");
        v.check(
            validation::is_email(&self.email),
            "email",
            "Email must be a valid email address.",
        );
        v.check(
            validation::not_blank(&self.message),
            "message",
            "Message is required.",
        );
        v.check(
            validation::max_chars(&self.message, MAX_MESSAGE_CHARS),
            "message",
            "Message must be less than 1,000 characters.",
        );
        v
    }
}

#[derive(Template)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub page: PageData,
    pub form: ContactForm,
    pub errors: Validator,
}

#[derive(Template)]
#[template(path = "pages/contact_success.html")]
pub struct ContactSuccessTemplate {
    pub page: PageData,
    pub name: String,
}

/// GET /contact/
pub async fn contact_page(page: Page) -> Result<Response, AppError> {
    let template = ContactTemplate {
        page: page.data().await?,
        form: ContactForm::default(),
        errors: Validator::new(),
    };
    render(StatusCode::OK, &template)
}

/// POST /contact/
///
/// A valid submission is mailed in the background; the page does not wait.
pub async fn contact_submit(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if errors.has_errors() {
        let template = ContactTemplate {
            page: page.data().await?,
            form,
            errors,
        };
        return render(StatusCode::OK, &template);
    }

    let mailer = Arc::clone(&state.mailer);
    let to = state.contact_recipient.clone();
    let submission = form.clone();
    state.tasks.spawn(move || -> Result<(), MailError> {
        let email = mail::contact_email(
            &to,
            &submission.name,
            &submission.email,
            &submission.message,
        )?;
        mailer.send(&email)
    });

    let template = ContactSuccessTemplate {
        page: page.data().await?,
        name: form.name,
    };
    render(StatusCode::OK, &template)
}

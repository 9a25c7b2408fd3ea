//! Page and endpoint handlers.

pub mod contact;

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, NOT_FOUND_MESSAGE};
use crate::filters;
use crate::flash::FlashLevel;
use crate::mail::{self, MailError};
use crate::state::AppState;
use crate::version;
use crate::view::{render, Page, PageData};

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub page: PageData,
}

/// GET /
pub async fn home(page: Page) -> Result<Response, AppError> {
    page.flash(FlashLevel::Success, "Welcome!").await?;
    page.flash(FlashLevel::Success, "You made it!").await?;

    let template = HomeTemplate {
        page: page.data().await?,
    };
    render(StatusCode::OK, &template)
}

/// GET /health/
pub async fn health(State(state): State<AppState>) -> Response {
    let body = format!(
        "status: OK\ndevMode: {}\nver: {}\n",
        state.dev_mode,
        version::version()
    );
    plain_text(StatusCode::OK, body)
}

/// GET /send-mail/ - queue the example email and return at once.
pub async fn send_mail(State(state): State<AppState>) -> Response {
    let mailer = Arc::clone(&state.mailer);
    let to = state.contact_recipient.clone();
    state.tasks.spawn(move || -> Result<(), MailError> {
        let email = mail::example_email(&to, "Person")?;
        mailer.send(&email)
    });

    plain_text(StatusCode::OK, "Email queued")
}

/// GET /basic-auth-required/
pub async fn basic_auth_demo() -> Response {
    plain_text(
        StatusCode::OK,
        "You're visiting a page protected with basic authentication!",
    )
}

/// GET /login-required/
pub async fn login_required_demo() -> Response {
    plain_text(
        StatusCode::OK,
        "You're visiting a page that requires login!",
    )
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    plain_text(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body.into()).into_response()
}

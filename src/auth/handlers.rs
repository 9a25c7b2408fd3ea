//! Login and logout pages.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::middleware::AUTHENTICATED_KEY;
use crate::error::AppError;
use crate::filters;
use crate::flash::FlashLevel;
use crate::state::AppState;
use crate::validation::{self, Validator};
use crate::view::{render, Page, PageData};

/// Shown for both an unknown identity and a wrong password.
pub const INCORRECT_CREDENTIALS: &str = "Email or password is incorrect";

const MAX_EMAIL_CHARS: usize = 100;
const MAX_PASSWORD_CHARS: usize = 150;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageData,
    pub email: String,
    pub next: String,
    pub errors: Validator,
}

#[derive(Template)]
#[template(path = "auth/logout.html")]
pub struct LogoutTemplate {
    pub page: PageData,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

impl LoginForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.check(validation::not_blank(&self.email), "email", "Email is required.");
        v.check(
            validation::max_chars(&self.email, MAX_EMAIL_CHARS),
            "email",
            "Email must be less than 100 characters.",
        );
        v.check(
            validation::is_email(&self.email),
            "email",
            "Email must be a valid email address.",
        );
        v.check(
            validation::not_blank(&self.password),
            "password",
            "Password is required.",
        );
        v.check(
            validation::max_chars(&self.password, MAX_PASSWORD_CHARS),
            "password",
            "Password must be less than 150 characters.",
        );
        v
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: &str) -> &str {
    let same_site = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    if same_site { next } else { "/" }
}

/// GET /login/
pub async fn login_page(page: Page, Query(query): Query<NextQuery>) -> Result<Response, AppError> {
    let template = LoginTemplate {
        page: page.data().await?,
        email: String::new(),
        next: query.next,
        errors: Validator::new(),
    };
    render(StatusCode::OK, &template)
}

/// POST /login/
pub async fn login_submit(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if errors.has_errors() {
        let template = LoginTemplate {
            page: page.data().await?,
            email: form.email,
            next: form.next,
            errors,
        };
        return render(StatusCode::UNPROCESSABLE_ENTITY, &template);
    }

    if !state.credentials.verify(&form.email, &form.password).await? {
        tracing::info!("login: rejected credentials");
        page.flash(FlashLevel::Error, INCORRECT_CREDENTIALS).await?;
        let template = LoginTemplate {
            page: page.data().await?,
            email: form.email,
            next: form.next,
            errors,
        };
        return render(StatusCode::UNPROCESSABLE_ENTITY, &template);
    }

    let session = page.session();
    session.cycle_id().await?;
    session.insert(AUTHENTICATED_KEY, true).await?;
    page.flash(FlashLevel::Success, "You are in!").await?;

    Ok(Redirect::to(safe_next(&form.next)).into_response())
}

/// GET /logout/
pub async fn logout_page(page: Page) -> Result<Response, AppError> {
    let template = LogoutTemplate {
        page: page.data().await?,
    };
    render(StatusCode::OK, &template)
}

/// POST /logout/
pub async fn logout_submit(page: Page) -> Result<Response, AppError> {
    let session = page.session();
    session.cycle_id().await?;
    session.remove::<bool>(AUTHENTICATED_KEY).await?;
    page.flash(FlashLevel::Success, "You've been logged out!").await?;

    Ok(Redirect::to("/").into_response())
}

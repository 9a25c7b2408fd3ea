//! Request-path error type and HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned for any server fault outside development mode.
pub const SERVER_ERROR_MESSAGE: &str =
    "The server encountered a problem and could not process your request";

/// Body returned for unknown routes.
pub const NOT_FOUND_MESSAGE: &str = "The requested resource could not be found";

/// Errors raised while handling a request.
///
/// Every variant is a server fault: client mistakes (bad forms, bad tokens,
/// bad credentials) are recovered locally into 4xx responses and never reach
/// this type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("session layer is not installed for this route")]
    MissingSession,
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
    #[error("password verification failed: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::PasswordHash(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            error = %self,
            "server error"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE).into_response()
    }
}

/// Plain-text response carrying the status' canonical reason phrase.
pub fn client_error(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    (status, reason).into_response()
}

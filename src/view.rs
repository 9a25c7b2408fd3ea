//! Page view-model shared by every rendered template.

use askama::Template;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;

use crate::auth::is_authenticated;
use crate::csrf::CsrfToken;
use crate::error::AppError;
use crate::flash::{self, FlashLevel, FlashMessage};
use crate::version;

/// Fields every page template reads from the base layout.
#[derive(Debug, Clone)]
pub struct PageData {
    /// Empty on routes without CSRF protection.
    pub csrf_token: String,
    pub is_authenticated: bool,
    pub messages: Vec<FlashMessage>,
    pub version: String,
    pub rendered_at: DateTime<Utc>,
}

/// Request-scoped handle used by handlers that render pages.
///
/// Extracting it never fails on a correctly layered router: the session comes
/// from the session layer, the token from the CSRF stage (if the route has
/// one) and the auth marker from the authentication stage.
pub struct Page {
    session: Session,
    csrf_token: Option<CsrfToken>,
    authenticated: bool,
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::MissingSession)?;

        Ok(Page {
            session,
            csrf_token: parts.extensions.get::<CsrfToken>().cloned(),
            authenticated: is_authenticated(&parts.extensions),
        })
    }
}

impl Page {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Queue a flash message for the next render.
    pub async fn flash(&self, level: FlashLevel, message: &str) -> Result<(), AppError> {
        flash::put(&self.session, level, message).await?;
        Ok(())
    }

    /// Build the view-model, draining the flash queue.
    pub async fn data(&self) -> Result<PageData, AppError> {
        Ok(PageData {
            csrf_token: self
                .csrf_token
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            is_authenticated: self.authenticated,
            messages: flash::drain(&self.session).await?,
            version: version::version(),
            rendered_at: Utc::now(),
        })
    }
}

/// Render `template` as an HTML response with the given status.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Result<Response, AppError> {
    let body = template.render()?;
    Ok((status, Html(body)).into_response())
}

//! Router assembly.

use std::path::Path;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::auth::{self, handlers as auth_handlers};
use crate::config::{SESSION_COOKIE, SESSION_LIFETIME_HOURS};
use crate::csrf;
use crate::handlers::{self, contact};
use crate::middleware::{
    log_request, security_headers, static_cache_control, PanicResponder,
};
use crate::state::AppState;

/// Build the full application.
///
/// Global stages, outermost first: security headers, panic recovery,
/// request logging, session load/save, authentication flagging. Gates are
/// per route: basic auth or login-required first, CSRF innermost.
pub fn app(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_path("/")
        .with_secure(true)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            SESSION_LIFETIME_HOURS,
        )));

    let open = Router::new()
        .route("/", get(handlers::home))
        .route("/health/", get(handlers::health))
        .route("/send-mail/", get(handlers::send_mail));

    let forms = Router::new()
        .route(
            "/contact/",
            get(contact::contact_page).post(contact::contact_submit),
        )
        .route(
            "/login/",
            get(auth_handlers::login_page).post(auth_handlers::login_submit),
        )
        .route_layer(middleware::from_fn(csrf::protect));

    let basic_auth_required = Router::new()
        .route("/basic-auth-required/", get(handlers::basic_auth_demo))
        .route_layer(middleware::from_fn(csrf::protect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::basic_auth,
        ));

    let login_required = Router::new()
        .route("/login-required/", get(handlers::login_required_demo))
        .route(
            "/logout/",
            get(auth_handlers::logout_page).post(auth_handlers::logout_submit),
        )
        .route_layer(middleware::from_fn(csrf::protect))
        .route_layer(middleware::from_fn(auth::require_login));

    let assets = ServiceBuilder::new()
        .layer(static_cache_control())
        .service(ServeDir::new(static_dir.as_ref()));

    Router::new()
        .merge(open)
        .merge(forms)
        .merge(basic_auth_required)
        .merge(login_required)
        .nest_service("/static", assets)
        .fallback(handlers::not_found)
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(security_headers))
                .layer(CatchPanicLayer::custom(PanicResponder::new(state.dev_mode)))
                .layer(middleware::from_fn(log_request))
                .layer(sessions)
                .layer(middleware::from_fn(auth::authenticate)),
        )
}

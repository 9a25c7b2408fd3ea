//! Global middleware stages.
//!
//! Outermost first, the app is wrapped in: security headers, panic recovery,
//! request logging, sessions and authentication flagging. See `routes::app`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::Once;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::catch_panic::ResponseForPanic;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::SERVER_ERROR_MESSAGE;
use crate::tasks::panic_message;

/// Set on every response.
pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

/// One year, for content-hashed static assets.
pub const STATIC_MAX_AGE: &str = "public, max-age=31536000";

/// Fill in [`SECURITY_HEADERS`]. A value the handler set itself is kept.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }
    response
}

/// Log one line per request, before it is handled.
pub async fn log_request(request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    tracing::info!(
        ip = %ip,
        proto = ?request.version(),
        method = %request.method(),
        uri = %uri,
        "request"
    );

    next.run(request).await
}

/// `Cache-Control` for everything under `/static/`.
pub fn static_cache_control() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(STATIC_MAX_AGE),
    )
}

thread_local! {
    static PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record a backtrace at the panic site for [`PanicResponder`].
///
/// Chains to the previously installed hook. Safe to call more than once.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<String> {
    PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

/// Turns a handler panic into a 500.
///
/// In dev mode the body carries the panic message and the backtrace
/// recorded by [`install_panic_hook`]; otherwise a fixed message.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    dev_mode: bool,
}

impl PanicResponder {
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());
        let trace = take_backtrace();
        tracing::error!(status = 500, error = %message, "server error");

        let body = if self.dev_mode {
            match trace {
                Some(trace) => format!("{message}\n\n{trace}"),
                None => message,
            }
        } else {
            SERVER_ERROR_MESSAGE.to_string()
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

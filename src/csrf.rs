//! Anti-forgery tokens for state-changing requests.
//!
//! Each session holds a random secret. Rendered pages receive a masked copy
//! of it (a fresh one-time pad per request, so the token text changes on
//! every page while the secret stays put). Unsafe methods must send a token
//! back, either as the `csrf_token` form field or the `X-CSRF-Token` header,
//! that unmasks to the session secret.

use axum::{
    body::{self, Body},
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::error::{client_error, AppError};

/// Hidden form field carrying the token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Header carrying the token for script-driven requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

const SECRET_KEY: &str = "csrf_secret";
const SECRET_LEN: usize = 32;
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// The masked token for the current request, for embedding in pages.
#[derive(Debug, Clone)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Route middleware enforcing CSRF tokens on unsafe methods.
///
/// Must sit inside the session layer. Rejections are 400 with no detail.
pub async fn protect(request: Request, next: Next) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(AppError::MissingSession)?;
    let secret = load_or_create_secret(&session).await?;

    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(CsrfToken(mask(&secret)));

    if is_safe(&parts.method) {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let (submitted, body) = match header_token(&parts.headers) {
        Some(token) => (Some(token), body),
        None => {
            let Ok(bytes) = body::to_bytes(body, MAX_FORM_BYTES).await else {
                tracing::warn!(uri = %parts.uri, "csrf: unreadable request body");
                return Ok(client_error(StatusCode::BAD_REQUEST));
            };
            (form_token(&parts.headers, &bytes), Body::from(bytes))
        }
    };

    match submitted {
        Some(token) if verify(&secret, &token) => {
            Ok(next.run(Request::from_parts(parts, body)).await)
        }
        Some(_) => {
            tracing::warn!(method = %parts.method, uri = %parts.uri, "csrf: token mismatch");
            Ok(client_error(StatusCode::BAD_REQUEST))
        }
        None => {
            tracing::warn!(method = %parts.method, uri = %parts.uri, "csrf: token missing");
            Ok(client_error(StatusCode::BAD_REQUEST))
        }
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

async fn load_or_create_secret(session: &Session) -> Result<[u8; SECRET_LEN], AppError> {
    if let Some(stored) = session.get::<String>(SECRET_KEY).await? {
        if let Some(secret) = decode_secret(&stored) {
            return Ok(secret);
        }
    }

    let secret: [u8; SECRET_LEN] = rand::random();
    session.insert(SECRET_KEY, hex::encode(secret)).await?;
    Ok(secret)
}

fn decode_secret(stored: &str) -> Option<[u8; SECRET_LEN]> {
    hex::decode(stored).ok()?.try_into().ok()
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn form_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return None;
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// `hex(pad || pad ^ secret)` with a fresh random pad.
fn mask(secret: &[u8; SECRET_LEN]) -> String {
    let pad: [u8; SECRET_LEN] = rand::random();
    let mut token = Vec::with_capacity(SECRET_LEN * 2);
    token.extend_from_slice(&pad);
    token.extend(pad.iter().zip(secret).map(|(p, s)| p ^ s));
    hex::encode(token)
}

fn verify(secret: &[u8; SECRET_LEN], token: &str) -> bool {
    let Ok(raw) = hex::decode(token) else {
        return false;
    };
    if raw.len() != SECRET_LEN * 2 {
        return false;
    }

    let (pad, masked) = raw.split_at(SECRET_LEN);
    let candidate: Vec<u8> = pad.iter().zip(masked).map(|(p, m)| p ^ m).collect();
    candidate.as_slice().ct_eq(secret.as_slice()).into()
}

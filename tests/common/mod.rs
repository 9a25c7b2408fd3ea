//! Shared harness for the end-to-end tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderName, HeaderValue};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use axum_test::{TestResponse, TestServer, TestServerConfig};
use regex::Regex;

use webstart::auth::Credentials;
use webstart::mail::{Email, MailError, Mailer};
use webstart::routes;
use webstart::state::AppState;
pub use webstart::testing::{cheap_hash, LogCapture};

pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "correct horse battery staple";
pub const RECIPIENT: &str = "Recipient <recipient@example.com>";

/// Keeps every message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Panics on every send.
pub struct PanickingMailer;

impl Mailer for PanickingMailer {
    fn send(&self, _email: &Email) -> Result<(), MailError> {
        panic!("mail server exploded")
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: RecordingMailer,
}

pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

pub fn app_with_mailer(mailer: Arc<dyn Mailer>, static_dir: PathBuf) -> (TestServer, AppState) {
    let credentials = Credentials::new(EMAIL, cheap_hash(PASSWORD)).unwrap();
    let state = AppState::new(credentials, mailer, false, RECIPIENT);
    let app = routes::app(state.clone(), static_dir);

    let config = TestServerConfig {
        save_cookies: true,
        ..TestServerConfig::default()
    };
    let server = TestServer::new_with_config(app, config).unwrap();
    (server, state)
}

pub fn spawn_app() -> TestApp {
    let mailer = RecordingMailer::default();
    let (server, state) = app_with_mailer(Arc::new(mailer.clone()), static_dir());
    TestApp {
        server,
        state,
        mailer,
    }
}

/// The CSRF token from the hidden form field of a rendered page.
pub fn csrf_token(response: &TestResponse) -> String {
    let rx = Regex::new(r#"name="csrf_token" value="([0-9a-f]+)""#).unwrap();
    rx.captures(&response.text())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .expect("page has a csrf_token field")
}

pub fn header_str(response: &TestResponse, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn basic_auth_header(user: &str, password: &str) -> (HeaderName, HeaderValue) {
    let mut headers = axum::http::HeaderMap::new();
    headers.typed_insert(Authorization::basic(user, password));
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .cloned()
        .unwrap();
    (axum::http::header::AUTHORIZATION, value)
}

/// Log in through the real form. Returns the POST response.
pub async fn login(app: &TestApp, email: &str, password: &str) -> TestResponse {
    let page = app.server.get("/login/").await;
    let token = csrf_token(&page);
    app.server
        .post("/login/")
        .form(&[
            ("csrf_token", token.as_str()),
            ("email", email),
            ("password", password),
            ("next", ""),
        ])
        .await
}

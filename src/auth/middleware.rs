//! Authentication flagging and the per-route auth gates.

use axum::{
    extract::{Request, State},
    http::{header, Extensions, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use tower_sessions::Session;

use crate::error::AppError;
use crate::state::AppState;

/// Session key holding the signed-in flag.
pub const AUTHENTICATED_KEY: &str = "authenticated";

/// Challenge sent with every basic-auth rejection.
pub const BASIC_AUTH_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

const BASIC_AUTH_MESSAGE: &str = "You must be authenticated to access this resource";

/// Request-extension marker set when the session is signed in.
#[derive(Debug, Clone, Copy)]
struct Authenticated;

/// Mark the request as coming from a signed-in session.
pub fn with_authenticated(extensions: &mut Extensions) {
    extensions.insert(Authenticated);
}

/// True when [`authenticate`] marked the request as signed in.
pub fn is_authenticated(extensions: &Extensions) -> bool {
    extensions.get::<Authenticated>().is_some()
}

/// Global middleware: copy the session's `authenticated` flag onto the request.
///
/// Runs inside the session layer. Absent or false leaves the request unmarked.
pub async fn authenticate(mut request: Request, next: Next) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(AppError::MissingSession)?;

    if session.get::<bool>(AUTHENTICATED_KEY).await?.unwrap_or(false) {
        with_authenticated(request.extensions_mut());
    }

    Ok(next.run(request).await)
}

/// Route gate: send anonymous visitors to the login page.
///
/// The requested path and query travel along as `next`. Pages served
/// through the gate are marked `Cache-Control: no-store`.
pub async fn require_login(request: Request, next: Next) -> Response {
    if !is_authenticated(request.extensions()) {
        let requested = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!("/login/?next={}", urlencoding::encode(requested));
        return Redirect::to(&location).into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Route gate: require HTTP Basic credentials matching the configured ones.
///
/// The submitted password is never logged.
pub async fn basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(Authorization(basic)) = request.headers().typed_get::<Authorization<Basic>>() else {
        return unauthorized();
    };

    match state.credentials.verify(basic.username(), basic.password()).await {
        Ok(true) => next.run(request).await,
        Ok(false) => unauthorized(),
        Err(err) => {
            tracing::error!(error = %err, "basic auth: password hash comparison failed");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, BASIC_AUTH_CHALLENGE)],
        BASIC_AUTH_MESSAGE,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cheap_hash;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn basic_router() -> Router {
        let state = AppState::for_tests("admin@example.com", &cheap_hash("password"));
        Router::new()
            .route("/", get(|| async { "OK" }))
            .route_layer(middleware::from_fn_with_state(state.clone(), basic_auth))
            .with_state(state)
    }

    fn basic_header(user: &str, password: &str) -> Authorization<Basic> {
        Authorization::basic(user, password)
    }

    async fn call(router: Router, auth: Option<Authorization<Basic>>) -> Response {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        if let Some(value) = auth {
            request.headers_mut().typed_insert(value);
        }
        router.oneshot(request).await.unwrap()
    }

    fn assert_challenged(response: &Response) {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_AUTH_CHALLENGE
        );
    }

    #[tokio::test]
    async fn test_basic_auth_without_header() {
        let response = call(basic_router(), None).await;
        assert_challenged(&response);
    }

    #[tokio::test]
    async fn test_basic_auth_wrong_identity() {
        let response = call(basic_router(), Some(basic_header("admin", "password"))).await;
        assert_challenged(&response);
    }

    #[tokio::test]
    async fn test_basic_auth_wrong_password() {
        let response = call(
            basic_router(),
            Some(basic_header("admin@example.com", "hunter2")),
        )
        .await;
        assert_challenged(&response);
    }

    #[tokio::test]
    async fn test_basic_auth_ok() {
        let response = call(
            basic_router(),
            Some(basic_header("admin@example.com", "password")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_login_redirects_with_next() {
        let router = Router::new()
            .route("/private/", get(|| async { "secret" }))
            .route_layer(middleware::from_fn(require_login));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/private/?tab=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login/?next=%2Fprivate%2F%3Ftab%3D2"
        );
    }

    #[tokio::test]
    async fn test_require_login_passes_marked_requests_and_disables_caching() {
        let router = Router::new()
            .route("/private/", get(|| async { "secret" }))
            .route_layer(middleware::from_fn(require_login))
            .layer(middleware::from_fn(|mut request: Request, next: Next| async move {
                with_authenticated(request.extensions_mut());
                next.run(request).await
            }));

        let response = router
            .oneshot(Request::builder().uri("/private/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }

    #[test]
    fn test_marker_accessors() {
        let mut extensions = Extensions::new();
        assert!(!is_authenticated(&extensions));
        with_authenticated(&mut extensions);
        assert!(is_authenticated(&extensions));
    }
}

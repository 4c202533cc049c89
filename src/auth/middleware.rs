//! Authentication middleware that verifies session tokens and handles redirects.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use axum_htmx::HxRedirect;
use serde_json::json;

use crate::{
    AppState,
    auth::{
        Identity,
        token::{SESSION_COOKIE, decode_session_token},
    },
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The secret the identity provider signs session tokens with.
    pub auth_secret: String,
    /// Where to send users that are not signed in.
    pub sign_in_url: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            auth_secret: state.auth_secret.clone(),
            sign_in_url: state.sign_in_url.clone(),
        }
    }
}

/// Get the session token from the `Authorization: Bearer` header, falling back to the session
/// cookie.
async fn get_session_token(parts: &mut Parts, state: &AuthState) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_owned());
    }

    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

/// Middleware function that checks for a valid session token.
/// The identity is placed into the request and the request executed normally if the token is
/// valid, otherwise the response from `on_unauthenticated` is returned.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    on_unauthenticated: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some(token) = get_session_token(&mut parts, &state).await else {
        tracing::debug!("No session token for {}", parts.uri.path());
        return on_unauthenticated(&state.sign_in_url);
    };

    let identity = match decode_session_token(&token, &state.auth_secret) {
        Ok(claims) => Identity::from(claims),
        Err(_) => return on_unauthenticated(&state.sign_in_url),
    };

    parts.extensions.insert(identity);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

/// Middleware function that checks for a valid session token.
/// The identity is placed into the request and the request executed normally if the token is
/// valid, otherwise a redirect to the sign in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(identity): Extension<Identity>`
/// to receive the identity.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |sign_in_url| {
        Redirect::to(sign_in_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid session token.
/// The identity is placed into the request and the request executed normally if the token is
/// valid, otherwise a HTMX redirect to the sign in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(identity): Extension<Identity>`
/// to receive the identity.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |sign_in_url| {
        (HxRedirect(sign_in_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware function for the JSON API.
/// Requests without a valid session token get a 401 with the standard JSON error body.
pub async fn auth_guard_api(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Unauthorized" })),
        )
            .into_response()
    })
    .await
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{Extension, Json, Router, middleware, routing::get};
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::auth::{
        Identity,
        middleware::{AuthState, auth_guard, auth_guard_api, auth_guard_hx},
        token::{Claims, SESSION_COOKIE, encode_session_token},
    };

    const SECRET: &str = "nafstenoas";
    const SIGN_IN_URL: &str = "/sign-in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";

    async fn test_handler(Extension(identity): Extension<Identity>) -> Json<Identity> {
        Json(identity)
    }

    fn auth_state() -> AuthState {
        AuthState {
            auth_secret: SECRET.to_owned(),
            sign_in_url: SIGN_IN_URL.to_owned(),
        }
    }

    fn get_test_server() -> TestServer {
        let state = auth_state();
        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn get_test_server_hx() -> TestServer {
        let state = auth_state();
        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn get_test_server_api() -> TestServer {
        let state = auth_state();
        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_api))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn token(secret: &str, expires_in: Duration) -> String {
        let claims = Claims {
            sub: "user_42".to_owned(),
            email: "sam@example.com".to_owned(),
            name: Some("Sam".to_owned()),
            exp: (OffsetDateTime::now_utc() + expires_in).unix_timestamp() as usize,
        };

        encode_session_token(&claims, secret).unwrap()
    }

    #[tokio::test]
    async fn bearer_token_passes_identity_to_handler() {
        let server = get_test_server();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .authorization_bearer(token(SECRET, Duration::hours(1)))
            .await;

        response.assert_status_ok();
        let identity = response.json::<serde_json::Value>();
        assert_eq!(identity["id"], "user_42");
        assert_eq!(identity["email"], "sam@example.com");
    }

    #[tokio::test]
    async fn session_cookie_passes_identity_to_handler() {
        let server = get_test_server();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::new(SESSION_COOKIE, token(SECRET, Duration::hours(1))))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["id"], "user_42");
    }

    #[tokio::test]
    async fn redirects_without_token() {
        let server = get_test_server();

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), SIGN_IN_URL);
    }

    #[tokio::test]
    async fn redirects_with_token_signed_by_another_secret() {
        let server = get_test_server();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .authorization_bearer(token("not the secret", Duration::hours(1)))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), SIGN_IN_URL);
    }

    #[tokio::test]
    async fn hx_redirects_with_expired_token() {
        let server = get_test_server_hx();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .authorization_bearer(token(SECRET, -Duration::hours(1)))
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), SIGN_IN_URL);
    }

    #[tokio::test]
    async fn api_guard_returns_401_json() {
        let server = get_test_server_api();

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_unauthorized();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unauthorized");
    }
}

//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /auth/register - Register a new account
//! - POST /auth/login - Login, get an access token and the refresh cookie
//! - POST /auth/refresh-token - Issue a new access token from the refresh cookie
//! - POST /auth/logout - End the session and clear the refresh cookie
//! - GET /auth/me - Current stored profile of the bearer
//! - GET /auth/users - All profiles (privileged roles only)
//!
//! Every response, successful or not, uses the `ApiResponse` envelope.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::auth::error::AuthError;
use crate::core::auth::extract::AuthenticatedUser;
use crate::core::auth::service::AuthService;
use crate::core::db::store::CredentialStore;
use crate::core::response::ApiResponse;
use crate::core::validation::{
    REFRESH_TOKEN_FIELD, ValidationError, validate_login, validate_logout, validate_registration,
};

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState<S> {
    pub auth_service: AuthService<S>,
}

impl<S: CredentialStore> AuthApiState<S> {
    pub fn new(auth_service: AuthService<S>) -> Self {
        Self { auth_service }
    }
}

/// Convert AuthError to an enveloped API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Validation(_) | AuthError::DuplicateIdentifier(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            err if err.is_authentication_failure() => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiResponse::failure(status, self.to_string()).into_response()
    }
}

/// Create the auth API router
pub fn auth_api_router<S: CredentialStore>(state: AuthApiState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/auth/register", post(register_handler::<S>))
        .route("/auth/login", post(login_handler::<S>))
        .route("/auth/refresh-token", post(refresh_token_handler::<S>))
        .route("/auth/logout", post(logout_handler::<S>))
        .route("/auth/me", get(me_handler))
        .route("/auth/users", get(users_handler::<S>))
        .with_state(state)
}

/// POST /auth/register
async fn register_handler<S: CredentialStore>(
    State(state): State<Arc<AuthApiState<S>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse, AuthError> {
    let registration =
        parse_body(payload, validate_registration).inspect_err(|e| log_failure("REGISTER", e))?;

    let profile = state
        .auth_service
        .register(registration)
        .await
        .inspect_err(|e| log_failure("REGISTER", e))?;

    tracing::info!(identifier = %profile.identifier, "AUTH -> REGISTER = User registration successfully");

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "User registration successfully!!",
    ))
}

/// POST /auth/login
async fn login_handler<S: CredentialStore>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse), AuthError> {
    let credentials =
        parse_body(payload, validate_login).inspect_err(|e| log_failure("LOGIN", e))?;

    let outcome = state
        .auth_service
        .login(credentials)
        .await
        .inspect_err(|e| log_failure("LOGIN", e))?;

    tracing::info!(identifier = %outcome.profile.identifier, "AUTH -> LOGIN = Login successfully");

    let max_age = state.auth_service.jwt().refresh_ttl().num_seconds();
    let jar = jar.add(refresh_cookie(outcome.tokens.refresh.token, max_age));

    let response = ApiResponse::success(StatusCode::OK, "Login successfully!").with_data(json!({
        "identifier": outcome.profile.identifier,
        "accessToken": outcome.tokens.access.token,
    }));

    Ok((jar, response))
}

/// POST /auth/refresh-token
async fn refresh_token_handler<S: CredentialStore>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
) -> Result<ApiResponse, AuthError> {
    let cookie = jar.get(REFRESH_TOKEN_FIELD).map(|c| c.value());

    let access = state
        .auth_service
        .refresh(cookie)
        .await
        .inspect_err(|e| log_failure("REFRESH TOKEN", e))?;

    tracing::info!("AUTH -> REFRESH TOKEN = Refresh token successfully");

    Ok(
        ApiResponse::success(StatusCode::OK, "Refresh token successfully!")
            .with_data(json!({ "accessToken": access.token })),
    )
}

/// POST /auth/logout
///
/// The refresh cookie is cleared whatever the outcome.
async fn logout_handler<S: CredentialStore>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
    payload: Result<Json<Value>, JsonRejection>,
) -> (CookieJar, Result<ApiResponse, AuthError>) {
    let result = async {
        let target = parse_body(payload, validate_logout)?;
        let identifier = target.identifier.clone();
        state.auth_service.logout(target).await?;
        Ok::<_, AuthError>(identifier)
    }
    .await;

    let response = match result {
        Ok(identifier) => {
            tracing::info!(identifier = %identifier, "AUTH -> LOGOUT = User logged out");
            Ok(ApiResponse::success(StatusCode::CREATED, "You are logout."))
        }
        Err(e) => {
            log_failure("LOGOUT", &e);
            Err(e)
        }
    };

    (jar.add(removal_cookie()), response)
}

/// GET /auth/me
async fn me_handler(user: AuthenticatedUser) -> ApiResponse {
    ApiResponse::success(StatusCode::OK, "Current user.").with_data(user.into_profile())
}

/// GET /auth/users
async fn users_handler<S: CredentialStore>(
    State(state): State<Arc<AuthApiState<S>>>,
    user: AuthenticatedUser,
) -> Result<ApiResponse, AuthError> {
    user.require_privileged()?;

    let users = state
        .auth_service
        .list_users()
        .await
        .inspect_err(|e| log_failure("USERS", e))?;

    Ok(ApiResponse::success(StatusCode::OK, "Users retrieved.").with_data(users))
}

/// Unwrap the JSON body and run the payload validator over it
fn parse_body<T>(
    payload: Result<Json<Value>, JsonRejection>,
    validate: fn(&Value) -> Result<T, ValidationError>,
) -> Result<T, AuthError> {
    let Json(value) = payload.map_err(|e| ValidationError::Malformed(e.body_text()))?;
    Ok(validate(&value)?)
}

fn log_failure(operation: &str, err: &AuthError) {
    match err {
        AuthError::Internal(_) => tracing::error!("AUTH -> {} = {}", operation, err),
        _ => tracing::warn!("AUTH -> {} = {}", operation, err),
    }
}

fn refresh_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_FIELD, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Expired cookie, sent even when the request carried none
fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((REFRESH_TOKEN_FIELD, "")).path("/").build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::{JwtConfig, JwtService};
    use crate::core::auth::password::PasswordHasher;
    use crate::core::db::models::{NewUser, Role};
    use crate::core::db::repositories::MemoryUserStore;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn test_router() -> (Router, MemoryUserStore) {
        let store = MemoryUserStore::new();
        let service = AuthService::new(
            store.clone(),
            JwtService::new(JwtConfig::new("api_test_secret")),
            PasswordHasher::new(4),
        );
        (auth_api_router(AuthApiState::new(service)), store)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn register(app: &Router, identifier: &str, password: &str) -> Response {
        app.clone()
            .oneshot(post_json(
                "/auth/register",
                json!({"identifier": identifier, "password": password}),
            ))
            .await
            .unwrap()
    }

    async fn login(app: &Router, identifier: &str, password: &str) -> Response {
        app.clone()
            .oneshot(post_json(
                "/auth/login",
                json!({"identifier": identifier, "password": password}),
            ))
            .await
            .unwrap()
    }

    #[test]
    fn test_auth_error_status_mapping() {
        let cases = [
            (
                AuthError::Validation(ValidationError::Required { field: "password" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AuthError::DuplicateIdentifier("001".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AuthError::UserNotFound, StatusCode::UNAUTHORIZED),
            (AuthError::AlreadyLoggedIn, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
            (
                AuthError::Internal("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("a.b.c".to_string(), 60).to_string();
        assert!(cookie.starts_with("refreshToken=a.b.c"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=60"));
    }

    #[tokio::test]
    async fn test_register_created() {
        let (app, store) = test_router();

        let response = register(&app, "001", "secret").await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["status"], json!(true));
        assert_eq!(body["statusCode"], json!(201));
        assert_eq!(body["message"], json!("User registration successfully!!"));
        assert!(store.find_by_identifier("001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_is_422() {
        let (app, _store) = test_router();
        register(&app, "001", "secret").await;

        let response = register(&app, "001", "other").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["status"], json!(false));
        assert_eq!(
            body["message"],
            json!("Identifier \"001\" already exists. Please try another one.")
        );
    }

    #[tokio::test]
    async fn test_register_validation_is_422_before_store() {
        let (app, store) = test_router();

        let response = app
            .clone()
            .oneshot(post_json("/auth/register", json!({"identifier": "001"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["message"],
            json!("\"password\" is required")
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_422() {
        let (app, _store) = test_router();

        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["statusCode"], json!(422));
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_returns_token() {
        let (app, _store) = test_router();
        register(&app, "001", "secret").await;

        let response = login(&app, "001", "secret").await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("refreshToken="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains(&format!("Max-Age={}", 30 * 24 * 60 * 60)));

        let body = body_json(response).await;
        assert_eq!(body["data"]["identifier"], json!("001"));
        assert!(body["data"]["accessToken"].as_str().unwrap().split('.').count() == 3);
    }

    #[tokio::test]
    async fn test_login_failures_are_401() {
        let (app, _store) = test_router();
        register(&app, "001", "secret").await;

        let response = login(&app, "404", "secret").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], json!("User does not exist."));

        let response = login(&app, "001", "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_empty());
        assert_eq!(body_json(response).await["message"], json!("Invalid credentials."));

        login(&app, "001", "secret").await;
        let response = login(&app, "001", "secret").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["message"],
            json!("User already logged in.")
        );
    }

    #[tokio::test]
    async fn test_refresh_token_flow() {
        let (app, _store) = test_router();
        register(&app, "001", "secret").await;
        let response = login(&app, "001", "secret").await;
        let cookie = set_cookie(&response);
        let pair = cookie.split(';').next().unwrap().to_string();

        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh-token")
            .header(header::COOKIE, pair)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], json!("Refresh token successfully!"));
        assert!(body["data"]["accessToken"].is_string());
    }

    #[tokio::test]
    async fn test_refresh_token_failures() {
        let (app, _store) = test_router();

        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh-token")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], json!("Invalid refresh token!"));

        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh-token")
            .header(header::COOKIE, "refreshToken=not-a-token")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh-token")
            .header(header::COOKIE, "refreshToken=aaa.bbb.ccc")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_and_session() {
        let (app, store) = test_router();
        register(&app, "001", "secret").await;
        login(&app, "001", "secret").await;

        let response = app
            .clone()
            .oneshot(post_json("/auth/logout", json!({"identifier": "001"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("refreshToken="));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(body_json(response).await["message"], json!("You are logout."));

        let user = store.find_by_identifier("001").await.unwrap().unwrap();
        assert!(!user.is_online);
    }

    #[tokio::test]
    async fn test_logout_idempotent_and_validated() {
        let (app, _store) = test_router();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/auth/logout", json!({"identifier": "ghost"})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(post_json("/auth/logout", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(set_cookie(&response).contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_me_and_users_endpoints() {
        let (app, store) = test_router();
        register(&app, "001", "secret").await;
        let body = body_json(login(&app, "001", "secret").await).await;
        let token = body["data"]["accessToken"].as_str().unwrap().to_string();

        let get = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(get("/auth/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["identifier"], json!("001"));
        assert!(body["data"].get("passwordHash").is_none());

        let response = app.clone().oneshot(get("/auth/users")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        store.set_role("001", Role::Admin);
        store
            .create(NewUser::with_default_role("002", "hash", None))
            .await
            .unwrap();

        let response = app.clone().oneshot(get("/auth/users")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_me_without_token_is_401() {
        let (app, _store) = test_router();

        let request = Request::builder()
            .uri("/auth/me")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], json!("Invalid access token."));
    }
}

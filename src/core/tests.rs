//! Cross-module scenarios driven through the assembled router

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use crate::app::app;
use crate::core::auth::{AuthService, JwtConfig, JwtService, PasswordHasher};
use crate::core::config::Config;
use crate::core::db::{CredentialStore, MemoryUserStore, Role};
use crate::core::presence::{ClientEvent, PresenceHandle, ServerEvent};

struct Harness {
    app: Router,
    store: MemoryUserStore,
    presence: PresenceHandle,
}

fn harness() -> Harness {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("scenario_secret".to_string()),
        _ => None,
    })
    .unwrap();
    let store = MemoryUserStore::new();
    let presence = PresenceHandle::spawn();
    let service = AuthService::new(
        store.clone(),
        JwtService::new(JwtConfig::new("scenario_secret")),
        PasswordHasher::new(4),
    );

    Harness {
        app: app(service, presence.clone(), &config),
        store,
        presence,
    }
}

impl Harness {
    async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` part of the response's Set-Cookie header
fn cookie_pair(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_register_login_logout_login() {
    let h = harness();
    let account = json!({"identifier": "001", "password": "secret"});

    let response = h.post("/auth/register", account.clone(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = h.post("/auth/login", account.clone(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_pair(&response).starts_with("refreshToken="));

    let response = h.post("/auth/login", account.clone(), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "User already logged in.");

    let response = h
        .post("/auth/logout", json!({"identifier": "001"}), None)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(cookie_pair(&response), "refreshToken=");

    let response = h.post("/auth/login", account, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_keeps_first_account() {
    let h = harness();

    h.post(
        "/auth/register",
        json!({"nik": "001", "password": "first"}),
        None,
    )
    .await;
    let response = h
        .post(
            "/auth/register",
            json!({"identifier": "001", "password": "second"}),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = h
        .post(
            "/auth/login",
            json!({"identifier": "001", "password": "first"}),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_reflects_role_change() {
    let h = harness();
    let account = json!({"identifier": "001", "password": "secret"});
    h.post("/auth/register", account.clone(), None).await;
    let response = h.post("/auth/login", account, None).await;
    let cookie = cookie_pair(&response);

    h.store.set_role("001", Role::ServiceAdvisor);

    let response = h.post("/auth/refresh-token", json!({}), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await["data"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    let claims = JwtService::new(JwtConfig::new("scenario_secret"))
        .verify_access(&token)
        .unwrap();
    assert_eq!(claims.profile.role, Role::ServiceAdvisor);

    h.store.remove("001");
    let response = h.post("/auth/refresh-token", json!({}), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_then_presence_announcement() {
    let h = harness();
    let account = json!({"identifier": "001", "password": "secret"});
    h.post("/auth/register", account.clone(), None).await;
    h.post("/auth/login", account, None).await;

    let stored = h.store.find_by_identifier("001").await.unwrap().unwrap();
    assert!(stored.is_online);

    let (tx, mut rx) = mpsc::channel(16);
    let connection = h.presence.connect(tx).await.unwrap();

    let ClientEvent::Online(profile) = serde_json::from_value::<ClientEvent>(json!({
        "event": "online",
        "data": {"identifier": stored.identifier, "role": stored.role, "isOnline": true}
    }))
    .unwrap() else {
        panic!("expected an online event");
    };
    h.presence.online(connection, profile).await.unwrap();
    h.presence.snapshot().await.unwrap();

    let mut last = None;
    while let Ok(ServerEvent::OnlineUsers(users)) = rx.try_recv() {
        last = Some(users);
    }
    let users = last.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].identifier, "001");
}

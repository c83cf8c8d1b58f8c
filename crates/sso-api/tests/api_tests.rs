//! API Integration Tests
//!
//! Drive the full router over an in-memory store.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use sso_api::auth::{validate_token, Argon2Hasher, AuthService, PasswordConfig, TokenIssuer};
use sso_api::{create_router, state::AppState};
use sso_core::{
    AdminProvider, AppConfig, AppProvider, Application, InMemoryStore, StorageHealth, User,
    UserProvider, UserSaver,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const APP_ID: i32 = 1;
const APP_SECRET: &str = "test-secret";

fn test_app() -> Application {
    Application::new(APP_ID, "test", APP_SECRET)
}

fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::new(&PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: None,
    })
    .unwrap()
}

fn test_service(store: Arc<InMemoryStore>) -> AuthService {
    AuthService::new(
        Arc::new(cheap_hasher()),
        store,
        TokenIssuer::new(Duration::from_secs(3600)),
        tracing::Span::none(),
    )
}

/// Router plus a handle on its store for seeding
fn create_test_router() -> (Router, Arc<InMemoryStore>, Arc<AppState>) {
    let store = Arc::new(InMemoryStore::new().with_app(test_app()));
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        test_service(store.clone()),
        store.clone(),
    ));
    (create_router(state.clone()), store, state)
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn create_raw_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str, app_id: i32) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": password, "app_id": app_id })),
        ),
    )
    .await
}

async fn is_admin(app: &Router, user_id: i64) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/is-admin",
            Some(json!({ "user_id": user_id })),
        ),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = create_test_router();

    let (status, json) = send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let (app, _, state) = create_test_router();

    let (status, json) = send(&app, create_json_request("GET", "/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["database"], true);
    assert_eq!(json["env"], "local");

    state.set_ready(false);
    let (status, json) = send(&app, create_json_request("GET", "/ready", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
}

/// Storage that never answers its ping
struct UnreachableStorage;

#[async_trait]
impl StorageHealth for UnreachableStorage {
    async fn ping(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_readiness_reports_storage_down() {
    let store = Arc::new(InMemoryStore::new().with_app(test_app()));
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        test_service(store),
        Arc::new(UnreachableStorage),
    ));
    let app = create_router(state);

    let (status, json) = send(&app, create_json_request("GET", "/ready", None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["database"], false);
}

#[tokio::test]
async fn test_requests_are_counted() {
    let (app, _, state) = create_test_router();

    send(&app, create_json_request("GET", "/health", None)).await;
    send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(state.get_request_count(), 2);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _, _) = create_test_router();

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/auth/login"].is_object());
}

// =============================================================================
// Authentication Flow
// =============================================================================

#[tokio::test]
async fn test_full_auth_flow() {
    let (app, store, _) = create_test_router();

    let (status, json) = register(&app, "a@x.com", "p1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["user_id"], 1);

    let (status, json) = login(&app, "a@x.com", "p1", APP_ID).await;
    assert_eq!(status, StatusCode::OK);
    let token = json["token"].as_str().unwrap();

    let claims = validate_token(token, &test_app()).unwrap();
    assert_eq!(claims.uid, 1);
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.app_id, APP_ID);

    let (status, json) = is_admin(&app, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_admin"], false);

    store.set_admin(1, true).await.unwrap();
    let (_, json) = is_admin(&app, 1).await;
    assert_eq!(json["is_admin"], true);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (app, store, _) = create_test_router();

    let (status, _) = register(&app, "a@x.com", "p1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = register(&app, "a@x.com", "p2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "User already exists");
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (app, store, _) = create_test_router();

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/v1/auth/register", Some(json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "email or password is empty");
    assert_eq!(store.user_count().await, 0);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_alike() {
    let (app, _, _) = create_test_router();
    register(&app, "a@x.com", "p1").await;

    let (wrong_status, wrong_body) = login(&app, "a@x.com", "nope", APP_ID).await;
    let (unknown_status, unknown_body) = login(&app, "b@x.com", "p1", APP_ID).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["message"], "wrong credentials");
}

#[tokio::test]
async fn test_login_validation() {
    let (app, _, _) = create_test_router();

    let (status, json) = login(&app, "", "p1", APP_ID).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "email or password is empty");

    let (status, json) = login(&app, "a@x.com", "p1", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "no app_id provided");
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let (app, _, _) = create_test_router();

    let (status, json) = send(
        &app,
        create_raw_request(
            "/api/v1/auth/login",
            r#"{"email":"a@x.com","password":"p1","app_id":"one"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_ARGUMENT");
    assert!(json["message"].is_string());

    let (status, json) = send(
        &app,
        create_raw_request("/api/v1/auth/register", r#"{"email":"a@x.com","pass"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_ARGUMENT");

    let (status, json) = send(
        &app,
        create_raw_request("/api/v1/auth/is-admin", r#"{"user_id":true}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_login_unknown_app_is_internal() {
    let (app, _, _) = create_test_router();
    register(&app, "a@x.com", "p1").await;

    let (status, json) = login(&app, "a@x.com", "p1", 42).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Internal Error");
}

#[tokio::test]
async fn test_is_admin_unknown_user() {
    let (app, _, _) = create_test_router();

    let (status, json) = is_admin(&app, 99).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "User not found");

    let (status, json) = is_admin(&app, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "no user_id provided");
}

#[tokio::test]
async fn test_tokens_are_scoped_to_application() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_app(test_app())
            .with_app(Application::new(2, "other", "other-secret")),
    );
    let service = test_service(store);

    service.register("a@x.com", "p1").await.unwrap();
    let token = service.login("a@x.com", "p1", 2).await.unwrap();

    assert!(validate_token(&token, &test_app()).is_err());
    let claims = validate_token(&token, &Application::new(2, "other", "other-secret")).unwrap();
    assert_eq!(claims.app_id, 2);
}

// =============================================================================
// Request Timeout
// =============================================================================

/// Store whose user lookup outlives the request timeout
struct SlowStore {
    inner: InMemoryStore,
    lookup_finished: AtomicBool,
}

#[async_trait]
impl UserSaver for SlowStore {
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> sso_core::Result<i64> {
        self.inner.save_user(email, pass_hash).await
    }
}

#[async_trait]
impl UserProvider for SlowStore {
    async fn user(&self, email: &str) -> sso_core::Result<User> {
        tokio::time::sleep(Duration::from_secs(3)).await;
        self.lookup_finished.store(true, Ordering::SeqCst);
        self.inner.user(email).await
    }
}

#[async_trait]
impl AdminProvider for SlowStore {
    async fn is_admin(&self, user_id: i64) -> sso_core::Result<bool> {
        self.inner.is_admin(user_id).await
    }
}

#[async_trait]
impl AppProvider for SlowStore {
    async fn app(&self, app_id: i32) -> sso_core::Result<Application> {
        self.inner.app(app_id).await
    }
}

#[tokio::test]
async fn test_request_timeout_cancels_login() {
    let store = Arc::new(SlowStore {
        inner: InMemoryStore::new().with_app(test_app()),
        lookup_finished: AtomicBool::new(false),
    });
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;

    let service = AuthService::new(
        Arc::new(cheap_hasher()),
        store.clone(),
        TokenIssuer::new(Duration::from_secs(3600)),
        tracing::Span::none(),
    );
    let state = Arc::new(AppState::new(config, service, Arc::new(InMemoryStore::new())));
    let app = create_router(state);

    let (status, json) = login(&app, "a@x.com", "p1", APP_ID).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json["code"], "TIMEOUT");

    // The in-flight lookup was dropped, not left running
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!store.lookup_finished.load(Ordering::SeqCst));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_registered_user_can_login(
        email in "[a-z]{1,12}@[a-z]{1,8}\\.com",
        password in "[ -~]{1,32}",
    ) {
        let claims = tokio_test::block_on(async {
            let store = Arc::new(InMemoryStore::new().with_app(test_app()));
            let service = test_service(store);

            let user_id = service.register(&email, &password).await.unwrap();
            let token = service.login(&email, &password, APP_ID).await.unwrap();
            let claims = validate_token(&token, &test_app()).unwrap();
            (user_id, claims)
        });

        prop_assert_eq!(claims.0, claims.1.uid);
        prop_assert_eq!(claims.1.email, email);
    }
}

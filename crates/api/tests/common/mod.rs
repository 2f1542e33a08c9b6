#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use genflow_api::auth::jwt::{generate_access_token, JwtConfig, ROLE_AUTHENTICATED};
use genflow_api::config::{ServerConfig, UpstreamConfig};
use genflow_api::router::build_app_router;
use genflow_api::state::AppState;
use genflow_api::ws::WsManager;
use genflow_db::MemoryStore;
use genflow_events::EventBus;
use genflow_upstream::testing::{MemoryQueue, MemoryStorage, StaticFetcher};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Build a test `ServerConfig` with safe defaults.
///
/// Any CORS origin, a 30-second request timeout and placeholder upstream
/// credentials (the in-memory doubles never use them).
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: Vec::new(),
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        upstream: UpstreamConfig {
            supabase_url: "http://storage.invalid".to_string(),
            supabase_service_key: "service-key".to_string(),
            redis_rest_url: "http://redis.invalid".to_string(),
            redis_rest_token: "redis-token".to_string(),
        },
        job_queue: "job_queue".to_string(),
        status_queues: vec![
            "job_queue".to_string(),
            "sdxl_queue".to_string(),
            "wan_queue".to_string(),
        ],
        chat_worker_url: None,
        worker_health_token: None,
        worker_health_timeout_secs: 1,
        signed_url_ttl_secs: 3600,
        workspace_asset_ttl_hours: 48,
    }
}

/// The application wired to in-memory services, with handles to inspect them.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
    pub storage: Arc<MemoryStorage>,
    pub fetcher: Arc<StaticFetcher>,
    pub event_bus: Arc<EventBus>,
    pub ws_manager: Arc<WsManager>,
    pub state: AppState,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(StaticFetcher::new());
        let event_bus = Arc::new(EventBus::default());
        let ws_manager = Arc::new(WsManager::new());

        let state = AppState {
            store: store.clone(),
            queue: queue.clone(),
            storage: storage.clone(),
            fetcher: fetcher.clone(),
            http: reqwest::Client::new(),
            config: Arc::new(config.clone()),
            ws_manager: Arc::clone(&ws_manager),
            event_bus: Arc::clone(&event_bus),
        };

        Self {
            store,
            queue,
            storage,
            fetcher,
            event_bus,
            ws_manager,
            state,
            config,
        }
    }

    /// The full router with the production middleware stack.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone(), &self.config)
    }

    /// A valid bearer token for `user_id`.
    pub fn token_for(&self, user_id: Uuid) -> String {
        generate_access_token(user_id, ROLE_AUTHENTICATED, &self.config.jwt).unwrap()
    }
}

/// Send a GET request, optionally authenticated.
pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

/// Send a POST request with a JSON body, optionally authenticated.
pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

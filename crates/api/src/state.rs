use std::sync::Arc;

use genflow_db::Store;
use genflow_events::EventBus;
use genflow_upstream::{AssetFetcher, BlobStorage, JobQueue};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// External services are trait objects so tests can swap in in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production).
    pub store: Arc<dyn Store>,
    /// Redis job list.
    pub queue: Arc<dyn JobQueue>,
    /// Blob storage for generated assets.
    pub storage: Arc<dyn BlobStorage>,
    /// Downloads provider outputs.
    pub fetcher: Arc<dyn AssetFetcher>,
    /// Plain HTTP client for worker health probes.
    pub http: reqwest::Client,
    pub config: Arc<ServerConfig>,
    /// Realtime WebSocket connections and their subscriptions.
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus for job change events.
    pub event_bus: Arc<EventBus>,
}

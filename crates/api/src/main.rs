use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genflow_api::config::ServerConfig;
use genflow_api::router::build_app_router;
use genflow_api::state::AppState;
use genflow_api::ws;
use genflow_events::{ChangeFeed, EventBus};
use genflow_upstream::{HttpFetcher, RedisRestQueue, SupabaseStorage};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = genflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    genflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    genflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Upstream clients ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    let queue = RedisRestQueue::new(
        http.clone(),
        config.upstream.redis_rest_url.clone(),
        config.upstream.redis_rest_token.clone(),
    );
    let storage = SupabaseStorage::new(
        http.clone(),
        config.upstream.supabase_url.clone(),
        config.upstream.supabase_service_key.clone(),
    );
    let fetcher = HttpFetcher::new(http.clone());

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // Spawn the change feed (job row changes to realtime subscribers).
    let feed_handle = tokio::spawn(ChangeFeed::run(
        Arc::clone(&ws_manager),
        event_bus.subscribe(),
    ));
    tracing::info!("Event bus and change feed started");

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let state = AppState {
        store: Arc::new(genflow_db::PgStore::new(pool)),
        queue: Arc::new(queue),
        storage: Arc::new(storage),
        fetcher: Arc::new(fetcher),
        http,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router (and its state) is gone; dropping the last bus handle
    // closes the channel and ends the change feed.
    drop(event_bus);
    let _ = tokio::time::timeout(shutdown_timeout, feed_handle).await;
    tracing::info!("Change feed shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

//! `genflow-listener` -- completion listener daemon.
//!
//! Watches the signed-in user's generation jobs and logs a toast whenever
//! new assets land in the workspace. Realtime changes and periodic polls of
//! the jobs API run together; once realtime exhausts its retries only
//! polling remains.
//!
//! See [`ListenerConfig::from_env`] for the environment variables.

use std::sync::Arc;

use genflow_listener::channel::RealtimeListener;
use genflow_listener::client::JobsClient;
use genflow_listener::config::ListenerConfig;
use genflow_listener::delivery;
use genflow_listener::poller::{Poller, WatchList};
use genflow_listener::signals::SignalBus;
use genflow_listener::workspace::{Reconciler, TracingNotifier, WorkspaceState};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genflow_listener=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ListenerConfig::from_env();
    tracing::info!(
        user_id = %config.user_id,
        realtime_url = %config.realtime_url,
        channel = %config.channel,
        "Starting genflow-listener",
    );

    let cancel = CancellationToken::new();
    let bus = Arc::new(SignalBus::default());
    let watch = Arc::new(WatchList::new());
    for job_id in &config.watch_jobs {
        watch.watch(*job_id);
    }

    let jobs = JobsClient::new(reqwest::Client::new(), &config.api_url, config.access_token.clone());

    let reconciler = Reconciler::new(Arc::new(WorkspaceState::new()), Arc::new(TracingNotifier))
        .with_jobs_client(jobs.clone());
    let reconciler_handle = tokio::spawn(reconciler.run(bus.subscribe(), cancel.clone()));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        signal_cancel.cancel();
    });

    let realtime = RealtimeListener::new(
        config.realtime(),
        config.retry,
        Arc::clone(&bus),
        Arc::clone(&watch),
    );
    let poller = Poller::new(jobs, Arc::clone(&watch), Arc::clone(&bus), config.poll_interval);

    delivery::run(realtime, poller, cancel.clone()).await;

    cancel.cancel();
    let _ = reconciler_handle.await;
    tracing::info!("Listener stopped");
}

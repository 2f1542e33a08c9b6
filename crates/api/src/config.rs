use std::str::FromStr;

use genflow_core::queue::{DEFAULT_JOB_QUEUE, DEFAULT_STATUS_QUEUES};
use genflow_core::storage::{DEFAULT_SIGNED_URL_TTL_SECS, DEFAULT_WORKSPACE_ASSET_TTL_HOURS};

use crate::auth::jwt::JwtConfig;

/// Credentials and endpoints of the hosted services the pipeline calls.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Project URL, e.g. `https://xyz.supabase.co` (storage lives under it).
    pub supabase_url: String,
    /// Service role key used for storage uploads and signing.
    pub supabase_service_key: String,
    /// Upstash Redis REST endpoint.
    pub redis_rest_url: String,
    /// Upstash Redis REST bearer token.
    pub redis_rest_token: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development apart
/// from the secrets, which must be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks on shutdown (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// JWT verification settings.
    pub jwt: JwtConfig,
    pub upstream: UpstreamConfig,
    /// Redis list generation jobs are pushed onto.
    pub job_queue: String,
    /// Lists reported by `queue-status`.
    pub status_queues: Vec<String>,
    /// Fallback URL for the `chat` worker when none is registered.
    pub chat_worker_url: Option<String>,
    /// Bearer token for worker health probes.
    pub worker_health_token: Option<String>,
    pub worker_health_timeout_secs: u64,
    pub signed_url_ttl_secs: u64,
    pub workspace_asset_ttl_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                           |
    /// |------------------------------|-----------------------------------|
    /// | `HOST`                       | `0.0.0.0`                         |
    /// | `PORT`                       | `3000`                            |
    /// | `CORS_ORIGINS`               | any origin                        |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                              |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `5`                               |
    /// | `SUPABASE_URL`               | required                          |
    /// | `SUPABASE_SERVICE_ROLE_KEY`  | required                          |
    /// | `UPSTASH_REDIS_REST_URL`     | required                          |
    /// | `UPSTASH_REDIS_REST_TOKEN`   | required                          |
    /// | `JOB_QUEUE_NAME`             | `job_queue`                       |
    /// | `QUEUE_STATUS_LISTS`         | `job_queue,sdxl_queue,wan_queue`  |
    /// | `CHAT_WORKER_URL`            | unset                             |
    /// | `HUGGING_FACE_ACCESS_TOKEN`  | unset                             |
    /// | `WORKER_HEALTH_TIMEOUT_SECS` | `5`                               |
    /// | `SIGNED_URL_TTL_SECS`        | `3600`                            |
    /// | `WORKSPACE_ASSET_TTL_HOURS`  | `48`                              |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value does not parse.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_env("PORT", 3000u16);

        let cors_origins = list_env("CORS_ORIGINS").unwrap_or_default();

        let upstream = UpstreamConfig {
            supabase_url: required_env("SUPABASE_URL"),
            supabase_service_key: required_env("SUPABASE_SERVICE_ROLE_KEY"),
            redis_rest_url: required_env("UPSTASH_REDIS_REST_URL"),
            redis_rest_token: required_env("UPSTASH_REDIS_REST_TOKEN"),
        };

        let status_queues = list_env("QUEUE_STATUS_LISTS")
            .unwrap_or_else(|| DEFAULT_STATUS_QUEUES.iter().map(|s| s.to_string()).collect());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 5),
            jwt: JwtConfig::from_env(),
            upstream,
            job_queue: std::env::var("JOB_QUEUE_NAME").unwrap_or_else(|_| DEFAULT_JOB_QUEUE.into()),
            status_queues,
            chat_worker_url: optional_env("CHAT_WORKER_URL"),
            worker_health_token: optional_env("HUGGING_FACE_ACCESS_TOKEN"),
            worker_health_timeout_secs: parse_env("WORKER_HEALTH_TIMEOUT_SECS", 5),
            signed_url_ttl_secs: parse_env("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS),
            workspace_asset_ttl_hours: parse_env(
                "WORKSPACE_ASSET_TTL_HOURS",
                DEFAULT_WORKSPACE_ASSET_TTL_HOURS,
            ),
        }
    }
}

fn required_env(key: &str) -> String {
    let value = std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set in the environment"));
    assert!(!value.is_empty(), "{key} must not be empty");
    value
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

/// Comma-separated list; `None` when unset or empty.
fn list_env(key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = std::env::var(key)
        .ok()?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

use std::time::Duration;

use genflow_core::types::DbId;

use crate::channel::RealtimeConfig;
use crate::messages::MetadataPredicate;
use crate::reconnect::RetryPolicy;

/// Default realtime channel name.
const DEFAULT_CHANNEL: &str = "workspace-jobs";

/// Listener daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Realtime WebSocket endpoint, e.g. `ws://localhost:3000/realtime/v1/websocket`.
    pub realtime_url: String,
    /// Base URL of the API, used for job lookups.
    pub api_url: String,
    /// Public API key appended to the realtime URL for hosted realtime.
    pub api_key: Option<String>,
    pub access_token: String,
    pub user_id: DbId,
    pub channel: String,
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    pub predicate: Option<MetadataPredicate>,
    /// Jobs to watch from startup.
    pub watch_jobs: Vec<DbId>,
    pub retry: RetryPolicy,
}

impl ListenerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default          |
    /// |---------------------------|------------------|
    /// | `REALTIME_URL`            | required         |
    /// | `API_URL`                 | required         |
    /// | `ACCESS_TOKEN`            | required         |
    /// | `USER_ID`                 | required         |
    /// | `REALTIME_API_KEY`        | unset            |
    /// | `REALTIME_CHANNEL`        | `workspace-jobs` |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`             |
    /// | `POLL_INTERVAL_SECS`      | `5`              |
    /// | `WATCH_METADATA`          | unset (`key=value`) |
    /// | `WATCH_JOB_IDS`           | empty            |
    /// | `REALTIME_MAX_RETRIES`    | `2`              |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value does not parse.
    pub fn from_env() -> Self {
        let user_id = required_env("USER_ID")
            .parse()
            .unwrap_or_else(|e| panic!("USER_ID must be a UUID: {e}"));

        let predicate = std::env::var("WATCH_METADATA").ok().map(|raw| {
            MetadataPredicate::parse(&raw)
                .unwrap_or_else(|| panic!("WATCH_METADATA must be key=value, got '{raw}'"))
        });

        let watch_jobs = std::env::var("WATCH_JOB_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .unwrap_or_else(|e| panic!("WATCH_JOB_IDS entry '{s}' is not a UUID: {e}"))
            })
            .collect();

        let retry = RetryPolicy {
            max_retries: parse_env("REALTIME_MAX_RETRIES", RetryPolicy::default().max_retries),
            ..RetryPolicy::default()
        };

        Self {
            realtime_url: required_env("REALTIME_URL"),
            api_url: required_env("API_URL"),
            api_key: std::env::var("REALTIME_API_KEY").ok().filter(|k| !k.is_empty()),
            access_token: required_env("ACCESS_TOKEN"),
            user_id,
            channel: std::env::var("REALTIME_CHANNEL").unwrap_or_else(|_| DEFAULT_CHANNEL.into()),
            heartbeat_interval: Duration::from_secs(parse_env("HEARTBEAT_INTERVAL_SECS", 30)),
            poll_interval: Duration::from_secs(parse_env("POLL_INTERVAL_SECS", 5)),
            predicate,
            watch_jobs,
            retry,
        }
    }

    /// WebSocket URL with the `apikey`/`vsn` query hosted realtime expects.
    pub fn socket_url(&self) -> String {
        match &self.api_key {
            Some(key) => {
                let sep = if self.realtime_url.contains('?') { '&' } else { '?' };
                format!("{}{sep}apikey={key}&vsn=1.0.0", self.realtime_url)
            }
            None => self.realtime_url.clone(),
        }
    }

    pub fn realtime(&self) -> RealtimeConfig {
        RealtimeConfig {
            url: self.socket_url(),
            access_token: self.access_token.clone(),
            user_id: self.user_id,
            channel: self.channel.clone(),
            heartbeat_interval: self.heartbeat_interval,
            predicate: self.predicate.clone(),
        }
    }
}

fn required_env(key: &str) -> String {
    let value = std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set in the environment"));
    assert!(!value.is_empty(), "{key} must not be empty");
    value
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

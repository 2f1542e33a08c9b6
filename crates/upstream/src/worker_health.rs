//! Liveness probe for registered generation workers.
//!
//! The probe is advisory: callers always get a [`WorkerHealth`] back, never
//! an error, so a dead worker cannot break URL lookup.

use std::time::Duration;

use serde::Serialize;

use crate::http::join_url;

/// Default probe timeout.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHealth {
    pub is_healthy: bool,
    pub health_error: Option<String>,
}

impl WorkerHealth {
    fn healthy() -> Self {
        Self {
            is_healthy: true,
            health_error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            health_error: Some(error.into()),
        }
    }
}

/// `GET {worker_url}/health` with a bounded timeout.
///
/// `token`, when set, is sent as a bearer token (hosted workers behind an
/// access gate require one).
pub async fn probe_worker(
    client: &reqwest::Client,
    worker_url: &str,
    token: Option<&str>,
    timeout: Duration,
) -> WorkerHealth {
    let mut request = client.get(join_url(worker_url, "health")).timeout(timeout);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => WorkerHealth::healthy(),
        Ok(response) => {
            let status = response.status();
            tracing::warn!(worker_url, status = status.as_u16(), "Worker health check failed");
            WorkerHealth::unhealthy(format!("Health check returned {status}"))
        }
        Err(e) if e.is_timeout() => {
            tracing::warn!(worker_url, timeout_secs = timeout.as_secs(), "Worker health check timed out");
            WorkerHealth::unhealthy(format!(
                "Health check timed out after {}s",
                timeout.as_secs_f32()
            ))
        }
        Err(e) => {
            tracing::warn!(worker_url, error = %e, "Worker health check failed");
            WorkerHealth::unhealthy(format!("Health check failed: {e}"))
        }
    }
}

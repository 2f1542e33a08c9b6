//! HTTP client for the job lookup endpoint.

use genflow_core::types::DbId;
use serde::Deserialize;

use crate::error::ListenerError;
use crate::messages::JobRow;

/// `GET /functions/v1/jobs/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDetail {
    pub job: JobRow,
    #[serde(default)]
    pub assets: Vec<AssetSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetSummary {
    pub id: DbId,
    pub asset_type: String,
    pub asset_index: i32,
}

#[derive(Clone)]
pub struct JobsClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl JobsClient {
    pub fn new(http: reqwest::Client, base_url: &str, access_token: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    pub async fn job_detail(&self, job_id: DbId) -> Result<JobDetail, ListenerError> {
        let url = format!("{}/functions/v1/jobs/{job_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ListenerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

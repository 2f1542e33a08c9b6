//! Repository for the `usage_logs` table.

use sqlx::PgPool;

use crate::models::usage_log::{CreateUsageLog, UsageLog};

/// Column list for `usage_logs` queries.
const COLUMNS: &str = "\
    id, user_id, job_id, action, format, quality, credits_consumed, metadata, created_at";

/// Append-only writer for usage accounting rows.
pub struct UsageLogRepo;

impl UsageLogRepo {
    /// Record one usage row.
    pub async fn create(pool: &PgPool, input: &CreateUsageLog) -> Result<UsageLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO usage_logs (user_id, job_id, action, format, quality, \
                                     credits_consumed, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UsageLog>(&query)
            .bind(input.user_id)
            .bind(input.job_id)
            .bind(&input.action)
            .bind(&input.format)
            .bind(&input.quality)
            .bind(input.credits_consumed)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }
}

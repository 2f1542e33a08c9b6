//! Repository for the `active_workers` table.

use sqlx::PgPool;

use crate::models::worker::ActiveWorker;

pub struct WorkerRepo;

impl WorkerRepo {
    /// Current registration for a worker type, if any.
    pub async fn find_active(
        pool: &PgPool,
        worker_type: &str,
    ) -> Result<Option<ActiveWorker>, sqlx::Error> {
        sqlx::query_as::<_, ActiveWorker>(
            "SELECT worker_type, worker_url, updated_at FROM active_workers WHERE worker_type = $1",
        )
        .bind(worker_type)
        .fetch_optional(pool)
        .await
    }
}

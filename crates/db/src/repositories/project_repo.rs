//! Repository for the `projects` table (prompt lookup only).

use genflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::Project;

/// Column list for `projects` queries.
const COLUMNS: &str =
    "id, user_id, title, original_prompt, enhanced_prompt, created_at, updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    /// Find a project owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}

//! Repository tests against a real database.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use genflow_db::models::job::CreateJob;
use genflow_db::models::workspace_asset::CreateWorkspaceAsset;
use genflow_db::repositories::{JobRepo, WorkspaceAssetRepo};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn new_job(user_id: Uuid) -> CreateJob {
    CreateJob {
        user_id,
        job_type: "sdxl_image_high".into(),
        format: "image".into(),
        quality: "high".into(),
        metadata: json!({"prompt": "a lighthouse at dusk"}),
        project_id: None,
        video_id: None,
        image_id: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn completed_job_is_never_overwritten(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(Uuid::new_v4())).await.unwrap();
    assert_eq!(job.status, "queued");

    let done = JobRepo::complete(&pool, job.id, Some("https://signed"), &json!({"asset_count": 1}))
        .await
        .unwrap()
        .expect("queued job completes");
    assert_eq!(done.status, "completed");
    assert_eq!(done.metadata["prompt"], "a lighthouse at dusk");
    assert!(done.completed_at.is_some());

    let again = JobRepo::fail(&pool, job.id, "late failure", &json!({}))
        .await
        .unwrap();
    assert!(again.is_none());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status, "completed");
    assert_eq!(row.error_message, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn asset_upsert_is_idempotent(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(Uuid::new_v4())).await.unwrap();
    let asset = CreateWorkspaceAsset {
        user_id: job.user_id,
        asset_type: "image".into(),
        temp_storage_path: format!("{}/{}_0.png", job.user_id, job.id),
        job_id: job.id,
        asset_index: 0,
        generation_seed: Some(42),
        original_prompt: Some("a lighthouse at dusk".into()),
        generation_settings: json!({}),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(48),
    };

    let first = WorkspaceAssetRepo::upsert_batch(&pool, &[asset.clone()]).await.unwrap();
    let second = WorkspaceAssetRepo::upsert_batch(&pool, &[asset]).await.unwrap();
    assert_eq!(first[0].id, second[0].id);

    let listed = WorkspaceAssetRepo::list_by_job(&pool, job.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].generation_seed, Some(42));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_a_job_removes_it(pool: PgPool) {
    let job = JobRepo::create(&pool, &new_job(Uuid::new_v4())).await.unwrap();
    assert!(JobRepo::delete(&pool, job.id).await.unwrap());
    assert!(JobRepo::find_by_id(&pool, job.id).await.unwrap().is_none());
}

//! Integration tests for `POST /functions/v1/replicate-callback`.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json, TestApp};
use genflow_core::storage::BUCKET_WORKSPACE_TEMP;
use genflow_db::models::job::{CreateJob, Job};
use genflow_db::JobStore;
use serde_json::json;
use uuid::Uuid;

const CALLBACK: &str = "/functions/v1/replicate-callback";
const OUTPUT_URL: &str = "https://cdn.provider.test/pred-1/out-0.png";

/// Insert a queued job and attach the provider prediction id to it.
async fn seed_job(app: &TestApp, prediction_id: &str) -> Job {
    let job = app
        .store
        .create_job(&CreateJob {
            user_id: Uuid::new_v4(),
            job_type: "image_fast".into(),
            format: "image".into(),
            quality: "fast".into(),
            metadata: json!({ "prompt": "a cat", "seed": 42 }),
            project_id: None,
            video_id: None,
            image_id: None,
        })
        .await
        .unwrap();
    app.store.attach_external_id(job.id, prediction_id).unwrap()
}

fn job(app: &TestApp, id: Uuid) -> Job {
    app.store.jobs().into_iter().find(|j| j.id == id).unwrap()
}

// ---------------------------------------------------------------------------
// Test: succeeded callback completes the job with one workspace asset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn succeeded_callback_completes_job() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;
    app.fetcher.insert(OUTPUT_URL, b"png-bytes", Some("image/png"));

    let response = post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "succeeded", "output": [OUTPUT_URL] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let completed = job(&app, seeded.id);
    assert_eq!(completed.status, "completed");
    assert!(completed.completed_at.is_some());

    let assets = app.store.assets();
    assert_eq!(assets.len(), 1);
    let asset = &assets[0];
    assert_eq!(asset.job_id, seeded.id);
    assert_eq!(asset.asset_index, 0);
    assert_eq!(asset.generation_seed, Some(42));
    assert_eq!(asset.original_prompt.as_deref(), Some("a cat"));
    assert_eq!(
        asset.temp_storage_path,
        format!("{}/{}_0.png", seeded.user_id, seeded.id)
    );

    let stored = app
        .storage
        .get(BUCKET_WORKSPACE_TEMP, &asset.temp_storage_path)
        .unwrap();
    assert_eq!(stored.bytes, b"png-bytes");
    assert_eq!(stored.content_type, "image/png");

    let result_url = completed.result_url.unwrap();
    assert!(result_url.starts_with("memory://workspace-temp/"));
    assert_eq!(
        completed.metadata["workspace_asset_ids"],
        json!([asset.id.to_string()])
    );
    assert_eq!(completed.metadata["provider_status"], "succeeded");
}

// ---------------------------------------------------------------------------
// Test: a duplicate delivery is acknowledged without side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_callback_is_idempotent() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;
    app.fetcher.insert(OUTPUT_URL, b"png-bytes", Some("image/png"));
    let body = json!({ "id": "pred-1", "status": "succeeded", "output": OUTPUT_URL });

    let first = post_json(app.router(), CALLBACK, None, body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let after_first = job(&app, seeded.id);

    let second = post_json(app.router(), CALLBACK, None, body).await;
    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["duplicate"], true);

    assert_eq!(app.fetcher.calls(), 1);
    assert_eq!(app.store.assets().len(), 1);
    assert_eq!(app.storage.len(), 1);
    assert_eq!(job(&app, seeded.id), after_first);
}

// ---------------------------------------------------------------------------
// Test: unknown prediction ids are 404 and mutate nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_prediction_returns_404() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    let response = post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-unknown", "status": "succeeded", "output": [OUTPUT_URL] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert_eq!(job(&app, seeded.id), seeded);
    assert_eq!(app.fetcher.calls(), 0);
    assert!(app.store.assets().is_empty());
}

// ---------------------------------------------------------------------------
// Test: failure and cancellation paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_callback_records_error() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    let response = post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "failed", "error": "CUDA out of memory" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let failed = job(&app, seeded.id);
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("CUDA out of memory"));
}

#[tokio::test]
async fn canceled_callback_fails_job() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "canceled" }),
    )
    .await;

    let failed = job(&app, seeded.id);
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("Prediction canceled"));
}

#[tokio::test]
async fn succeeded_without_output_fails_job() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "succeeded", "output": null }),
    )
    .await;

    let failed = job(&app, seeded.id);
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("Provider returned no output"));
    assert!(app.store.assets().is_empty());
}

// ---------------------------------------------------------------------------
// Test: progress statuses move the job along without finishing it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn processing_callback_marks_job_processing() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "processing" }),
    )
    .await;

    let processing = job(&app, seeded.id);
    assert_eq!(processing.status, "processing");
    assert_eq!(processing.metadata["provider_status"], "processing");

    post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "starting" }),
    )
    .await;

    let still = job(&app, seeded.id);
    assert_eq!(still.status, "processing");
    assert_eq!(still.metadata["provider_status"], "starting");
}

// ---------------------------------------------------------------------------
// Test: a failed download is a 502 and leaves the job retryable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_failure_returns_502_and_keeps_job_open() {
    let app = TestApp::new();
    let seeded = seed_job(&app, "pred-1").await;

    let response = post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "succeeded", "output": ["https://cdn.provider.test/missing.png"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "UPSTREAM_ERROR");
    assert!(!job(&app, seeded.id).is_terminal());

    app.fetcher
        .insert("https://cdn.provider.test/missing.png", b"late", Some("image/png"));
    let retry = post_json(
        app.router(),
        CALLBACK,
        None,
        json!({ "id": "pred-1", "status": "succeeded", "output": ["https://cdn.provider.test/missing.png"] }),
    )
    .await;

    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(job(&app, seeded.id).status, "completed");
    assert_eq!(app.store.assets().len(), 1);
}

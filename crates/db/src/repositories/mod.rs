//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod project_repo;
pub mod usage_log_repo;
pub mod worker_repo;
pub mod workspace_asset_repo;

pub use job_repo::JobRepo;
pub use project_repo::ProjectRepo;
pub use usage_log_repo::UsageLogRepo;
pub use worker_repo::WorkerRepo;
pub use workspace_asset_repo::WorkspaceAssetRepo;

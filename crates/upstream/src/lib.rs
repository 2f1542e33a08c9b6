//! HTTP clients for the services the pipeline talks to.
//!
//! Each external dependency sits behind a trait so the API can be driven
//! against the in-memory doubles of the `testing` module (feature
//! `test-util`):
//!
//! - [`JobQueue`]: Redis list via the Upstash REST API.
//! - [`BlobStorage`]: Supabase Storage uploads and signed URLs.
//! - [`AssetFetcher`]: downloading provider outputs.
//! - [`probe_worker`]: worker `/health` checks.

mod http;

pub mod fetch;
pub mod queue;
pub mod storage;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker_health;

pub use fetch::{AssetFetcher, FetchError, FetchedAsset, HttpFetcher};
pub use queue::{JobQueue, QueueError, RedisRestQueue};
pub use storage::{BlobStorage, StorageError, SupabaseStorage};
pub use worker_health::{probe_worker, WorkerHealth, DEFAULT_HEALTH_TIMEOUT};

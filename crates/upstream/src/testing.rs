//! In-memory doubles for the upstream services.
//!
//! Compiled for this crate's tests and, behind the `test-util` feature, for
//! dependents' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::fetch::{AssetFetcher, FetchError, FetchedAsset};
use crate::queue::{JobQueue, QueueError};
use crate::storage::{BlobStorage, StorageError};

/// Process-local [`JobQueue`] for tests.
///
/// [`set_unreachable`](Self::set_unreachable) makes every command fail the
/// way a dead Redis endpoint would.
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    unreachable: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Items in `list`, head first.
    pub fn items(&self, list: &str) -> Vec<String> {
        self.lists
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(list)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), QueueError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(QueueError::Command("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn lpush(&self, list: &str, value: &str) -> Result<i64, QueueError> {
        self.check_reachable()?;
        let mut lists = self.lists.lock().unwrap_or_else(|p| p.into_inner());
        let items = lists.entry(list.to_string()).or_default();
        items.push_front(value.to_string());
        Ok(items.len() as i64)
    }

    async fn llen(&self, list: &str) -> Result<i64, QueueError> {
        self.check_reachable()?;
        let lists = self.lists.lock().unwrap_or_else(|p| p.into_inner());
        Ok(lists.get(list).map_or(0, |items| items.len() as i64))
    }
}

/// An object held by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local [`BlobStorage`] for tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner()).insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        if self.get(bucket, path).is_none() {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
        }
        Ok(format!(
            "memory://{bucket}/{path}?expires_in={}",
            ttl.as_secs()
        ))
    }
}

/// [`AssetFetcher`] serving fixed bodies, for tests.
///
/// Unknown URLs answer 404. Every call is counted.
#[derive(Default)]
pub struct StaticFetcher {
    assets: Mutex<HashMap<String, FetchedAsset>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, bytes: &[u8], content_type: Option<&str>) {
        self.assets.lock().unwrap_or_else(|p| p.into_inner()).insert(
            url.to_string(),
            FetchedAsset {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    /// Number of fetches attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.assets
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

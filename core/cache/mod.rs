//! # Download Cache
//!
//! Downloads without an explicit target path land in a cache shared by every pipeline running on
//! the host. A [CacheLockProvider] hands out a stable path per URL together with a [CacheLock]
//! that serializes writers: while one attempt holds the lock for a URL, every other attempt for
//! the same URL waits.
//!
mod file_cache;

pub use file_cache::*;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

#[async_trait]
pub trait CacheLockProvider: std::fmt::Debug + Send + Sync {
    /// Reserve the cache path for `url`, waiting until no one else holds it.
    async fn lock(&self, url: &str) -> Result<CacheLock, CacheError>;
}

/// Exclusive ownership of one cache path. The lock is released when this value is dropped.
pub struct CacheLock {
    url: String,
    path: PathBuf,
    host_lock: Option<std::fs::File>,
    guard: Option<OwnedMutexGuard<()>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl CacheLock {
    pub fn new(
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        guard: OwnedMutexGuard<()>,
        host_lock: Option<std::fs::File>,
    ) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            host_lock,
            guard: Some(guard),
            on_release: None,
        }
    }

    /// Run `f` once the lock has been released.
    pub fn on_release<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_release = Some(Box::new(f));
        self
    }

    /// The path reserved for the URL. It is the same for every lock on the same URL.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for CacheLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLock")
            .field("url", &self.url)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(file) = self.host_lock.take() {
            if let Err(err) = fs2::FileExt::unlock(&file) {
                debug!("Could not unlock {:?}: {:?}", self.path, err);
            }
        }
        drop(self.guard.take());
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
        debug!("Released lock for: {}", self.url);
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Could not create cache directory {root:?} due to: {err}")]
    CouldNotCreateCacheDir { root: PathBuf, err: std::io::Error },

    #[error("Could not lock cache file {path:?} due to: {err}")]
    CouldNotLock { path: PathBuf, err: std::io::Error },

    #[error("The cache lock task stopped unexpectedly: {0}")]
    LockTaskFailed(tokio::task::JoinError),
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(value: tokio::task::JoinError) -> Self {
        CacheError::LockTaskFailed(value)
    }
}

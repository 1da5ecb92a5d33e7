use super::{CacheError, CacheLock, CacheLockProvider};
use crate::Config;
use async_trait::async_trait;
use dashmap::DashMap;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

/// A directory-backed cache. Every URL maps to `<root>/<sha256 of the url><extension>`.
///
/// Locking happens at two levels: an in-process mutex per URL, and an advisory file lock on
/// `<path>.lock` so that separate processes sharing the same root also wait on each other.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FileCache {
    pub fn new(config: &Config) -> Self {
        Self::with_root(config.cache_root())
    }

    pub fn with_root<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path a URL is cached at. This does not take the lock.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let hash = format!("{:x}", Sha256::digest(url.as_bytes()));
        let file_name = match url_extension(url) {
            Some(ext) => format!("{}.{}", hash, ext),
            None => hash,
        };
        self.root.join(file_name)
    }
}

#[async_trait]
impl CacheLockProvider for FileCache {
    #[instrument(name = "FileCache::lock", skip(self))]
    async fn lock(&self, url: &str) -> Result<CacheLock, CacheError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| CacheError::CouldNotCreateCacheDir {
                root: self.root.clone(),
                err,
            })?;

        let path = self.cache_path(url);
        let mutex = self.locks.entry(url.to_string()).or_default().value().clone();

        debug!("Acquiring lock to download: {}", url);
        let guard = mutex.lock_owned().await;

        let lock_path = lock_file_path(&path);
        let host_lock = tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&lock_path)
                .and_then(|file| file.lock_exclusive().map(|_| file));
            file.map_err(|err| CacheError::CouldNotLock {
                path: lock_path,
                err,
            })
        })
        .await
        .map_err(CacheError::from)
        .and_then(|host_lock| host_lock);

        let host_lock = match host_lock {
            Ok(host_lock) => host_lock,
            Err(err) => {
                drop(guard);
                forget_idle_lock(&self.locks, url);
                return Err(err);
            }
        };

        debug!("Acquired lock for {} at {:?}", url, path);
        let locks = self.locks.clone();
        let key = url.to_string();
        Ok(CacheLock::new(url, path, guard, Some(host_lock))
            .on_release(move || forget_idle_lock(&locks, &key)))
    }
}

/// Drop the in-process mutex for `url` unless someone is still holding or waiting on it. Only
/// URLs with a lock in flight stay in the map.
fn forget_idle_lock(locks: &DashMap<String, Arc<Mutex<()>>>, url: &str) {
    locks.remove_if(url, |_, mutex| Arc::strong_count(mutex) == 1);
}

fn lock_file_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn url_extension(url: &str) -> Option<String> {
    let last_segment = match Url::parse(url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        Err(_) => Path::new(url)
            .file_name()
            .map(|name| name.to_string_lossy().to_string()),
    }?;

    Path::new(&last_segment)
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cache_paths_are_stable_and_keep_the_extension() {
        let cache = FileCache::with_root("/cache");
        let a = cache.cache_path("http://mirror-a/images/ubuntu.iso");
        let b = cache.cache_path("http://mirror-a/images/ubuntu.iso");
        let c = cache.cache_path("http://mirror-b/images/ubuntu.iso");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.extension().unwrap(), "iso");
        assert!(a.starts_with("/cache"));
    }

    #[test]
    fn cache_paths_ignore_query_strings() {
        let cache = FileCache::with_root("/cache");
        let path = cache.cache_path("https://mirror/tools.tar.gz?token=abc");
        assert_eq!(path.extension().unwrap(), "gz");
    }

    #[test]
    fn urls_without_extension_get_a_bare_hash() {
        let cache = FileCache::with_root("/cache");
        let path = cache.cache_path("https://mirror/download/");
        assert!(path.extension().is_none());
        assert_eq!(path.file_name().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn lock_returns_the_cache_path() {
        let root = assert_fs::TempDir::new().unwrap();
        let cache = FileCache::with_root(root.path());
        let url = "http://mirror/x.iso";

        let lock = cache.lock(url).await.unwrap();
        assert_eq!(lock.path(), cache.cache_path(url));
    }

    #[tokio::test]
    async fn second_lock_on_the_same_url_waits_for_the_first() {
        let root = assert_fs::TempDir::new().unwrap();
        let cache = FileCache::with_root(root.path());
        let url = "http://mirror/x.iso";

        let first = cache.lock(url).await.unwrap();

        let contender = cache.clone();
        let mut second = tokio::spawn(async move { contender.lock(url).await.map(|_| ()) });

        let waited = tokio::time::timeout(Duration::from_millis(200), &mut second).await;
        assert!(waited.is_err(), "second lock was granted while held");

        drop(first);

        let acquired = tokio::time::timeout(Duration::from_secs(5), second)
            .await
            .expect("second lock was never granted");
        assert_matches!(acquired, Ok(Ok(())));
    }

    #[tokio::test]
    async fn different_urls_do_not_block_each_other() {
        let root = assert_fs::TempDir::new().unwrap();
        let cache = FileCache::with_root(root.path());

        let _a = cache.lock("http://mirror/a.iso").await.unwrap();
        let b = tokio::time::timeout(Duration::from_secs(5), cache.lock("http://mirror/b.iso"))
            .await
            .expect("unrelated url was blocked");
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let root = assert_fs::TempDir::new().unwrap();
        let cache = FileCache::with_root(root.path());

        for i in 0..10 {
            let lock = cache.lock(&format!("http://mirror/{i}.iso")).await.unwrap();
            assert_eq!(cache.locks.len(), 1);
            drop(lock);
        }

        assert!(cache.locks.is_empty());
    }

    #[tokio::test]
    async fn a_lock_with_waiters_is_kept_until_the_last_one_is_done() {
        let root = assert_fs::TempDir::new().unwrap();
        let cache = FileCache::with_root(root.path());
        let url = "http://mirror/x.iso";

        let first = cache.lock(url).await.unwrap();
        let contender = cache.clone();
        let second = tokio::spawn(async move { contender.lock(url).await.unwrap() });
        tokio::time::sleep(Duration::from_millis(100)).await;

        drop(first);
        assert_eq!(cache.locks.len(), 1);

        let second = tokio::time::timeout(Duration::from_secs(5), second)
            .await
            .expect("second lock was never granted")
            .unwrap();
        assert_eq!(cache.locks.len(), 1);

        drop(second);
        assert!(cache.locks.is_empty());
    }
}

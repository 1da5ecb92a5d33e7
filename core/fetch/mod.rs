//! # Fetch Engine
//!
//! A [Fetcher] moves the bytes behind one URL to one local path and verifies them against an
//! optional checksum. It reports how far along it is through a [ProgressTracker] and is expected
//! to stop early once its [CancellationToken] is cancelled.
//!
//! A fetcher only ever reports the success or failure of a single attempt. Deciding whether a
//! failure means "try the next mirror" or "stop everything" is up to the caller.
//!
mod client;
mod error;
mod progress;

pub use client::*;
pub use error::*;
pub use progress::*;

use crate::checksum::ExpectedChecksum;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use url::Url;

#[async_trait]
pub trait Fetcher: std::fmt::Debug + Send + Sync {
    /// Transfer `fetch.url()` and return the path of the verified file.
    async fn fetch(
        &self,
        fetch: ResolvedFetch,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Result<PathBuf, FetchError>;
}

/// Everything one attempt needs to know to fetch a single mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFetch {
    url: Url,
    target_path: PathBuf,
    checksum: Option<ExpectedChecksum>,
}

impl ResolvedFetch {
    /// Bind a mirror to a target path. Bare filesystem paths are accepted and treated as
    /// `file://` URLs.
    pub fn new<P>(
        url: &str,
        target_path: P,
        checksum: Option<ExpectedChecksum>,
    ) -> Result<Self, FetchError>
    where
        P: Into<PathBuf>,
    {
        Ok(Self {
            url: parse_url(url)?,
            target_path: target_path.into(),
            checksum,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn checksum(&self) -> Option<&ExpectedChecksum> {
        self.checksum.as_ref()
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    let invalid = |err| FetchError::InvalidUrl {
        url: url.to_string(),
        err,
    };

    match Url::parse(url) {
        Ok(parsed) => Ok(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(url);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()?.join(path)
            };
            Url::from_file_path(&path).map_err(|_| invalid(url::ParseError::RelativeUrlWithoutBase))
        }
        Err(err) => Err(invalid(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_absolute_urls() {
        let fetch = ResolvedFetch::new("https://mirror/x.iso", "/tmp/x.iso", None).unwrap();
        assert_eq!(fetch.url().as_str(), "https://mirror/x.iso");
        assert_eq!(fetch.target_path(), Path::new("/tmp/x.iso"));
        assert!(fetch.checksum().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn bare_paths_become_file_urls() {
        let fetch = ResolvedFetch::new("/srv/images/x.iso", "/tmp/x.iso", None).unwrap();
        assert_eq!(fetch.url().scheme(), "file");
        assert_eq!(fetch.url().path(), "/srv/images/x.iso");

        let relative = ResolvedFetch::new("images/x.iso", "/tmp/x.iso", None).unwrap();
        assert_eq!(relative.url().scheme(), "file");
        assert!(relative.url().path().ends_with("/images/x.iso"));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert_matches!(
            ResolvedFetch::new("http://[::1", "/tmp/x.iso", None),
            Err(FetchError::InvalidUrl { .. })
        );
    }
}

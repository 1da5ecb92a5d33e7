use super::{FetchError, Fetcher, ProgressTracker, ResolvedFetch};
use crate::checksum::{ChecksumHasher, ExpectedChecksum};
use crate::Config;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// The default [Fetcher]. Downloads `http(s)://` URLs and reads `file://` URLs.
///
/// Downloads are streamed into a temporary file next to the target path and only moved into
/// place once the checksum (if any) matched, so the target path never holds a partial file.
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: reqwest::Client,
    copy_local_files: bool,
}

impl DownloadClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: config.http_client().clone(),
            copy_local_files: config.copy_local_files(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            copy_local_files: false,
        }
    }

    /// Copy `file://` sources into the target path instead of verifying them where they are.
    pub fn copy_local_files(mut self, copy_local_files: bool) -> Self {
        self.copy_local_files = copy_local_files;
        self
    }

    /// If the target already exists and has the expected checksum there is nothing to download.
    async fn reuse_existing(
        &self,
        fetch: &ResolvedFetch,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<bool, FetchError> {
        let Some(checksum) = fetch.checksum() else {
            return Ok(false);
        };

        let target = fetch.target_path();
        if fs::metadata(target).await.is_err() {
            return Ok(false);
        }

        debug!("Verifying existing file at {:?}", target);
        let mut hasher = checksum.kind().hasher();
        stream_file(target, None, Some(&mut hasher), progress, cancel).await?;
        progress.reset();

        Ok(checksum.matches(&hasher.finalize()))
    }

    #[instrument(name = "DownloadClient::fetch_http", skip(self, progress, cancel))]
    async fn fetch_http(
        &self,
        fetch: &ResolvedFetch,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = self.client.get(fetch.url().clone()).send() => response?,
        };

        if !response.status().is_success() {
            return Err(FetchError::DownloadFailed {
                url: fetch.url().clone(),
                status: response.status(),
            });
        }

        progress.set_total(response.content_length());

        let target = fetch.target_path();
        let tempfile = tempfile_next_to(target).await?;
        let mut outfile = fs::File::from_std(tempfile.reopen()?);

        let mut hasher = fetch.checksum().map(|c| c.kind().hasher());
        let mut byte_stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                chunk = byte_stream.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let mut chunk = chunk?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            progress.advance(chunk.len() as u64);
            outfile.write_all_buf(&mut chunk).await?;
        }
        outfile.flush().await?;
        drop(outfile);

        verify(fetch, hasher)?;

        tempfile.persist(target)?;
        debug!("Downloaded {} to {:?}", fetch.url(), target);
        Ok(target.to_path_buf())
    }

    #[instrument(name = "DownloadClient::fetch_file", skip(self, progress, cancel))]
    async fn fetch_file(
        &self,
        fetch: &ResolvedFetch,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        let source = fetch
            .url()
            .to_file_path()
            .map_err(|_| FetchError::InvalidFilePath {
                url: fetch.url().clone(),
            })?;

        let metadata = fs::metadata(&source).await?;
        progress.set_total(Some(metadata.len()));

        let mut hasher = fetch.checksum().map(|c| c.kind().hasher());

        if !self.copy_local_files {
            stream_file(&source, None, hasher.as_mut(), progress, cancel).await?;
            verify(fetch, hasher)?;
            return Ok(source);
        }

        let target = fetch.target_path();
        let tempfile = tempfile_next_to(target).await?;
        let mut outfile = fs::File::from_std(tempfile.reopen()?);
        stream_file(&source, Some(&mut outfile), hasher.as_mut(), progress, cancel).await?;
        outfile.flush().await?;
        drop(outfile);

        verify(fetch, hasher)?;

        tempfile.persist(target)?;
        debug!("Copied {:?} to {:?}", source, target);
        Ok(target.to_path_buf())
    }
}

#[async_trait]
impl Fetcher for DownloadClient {
    #[instrument(name = "DownloadClient::fetch", skip(self, progress, cancel), fields(url = %fetch.url()))]
    async fn fetch(
        &self,
        fetch: ResolvedFetch,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        match fetch.url().scheme() {
            "http" | "https" => {
                if self.reuse_existing(&fetch, &progress, &cancel).await? {
                    info!("Reusing verified file at {:?}", fetch.target_path());
                    return Ok(fetch.target_path().to_path_buf());
                }
                self.fetch_http(&fetch, &progress, &cancel).await
            }
            "file" => self.fetch_file(&fetch, &progress, &cancel).await,
            scheme => Err(FetchError::UnsupportedScheme {
                url: fetch.url().clone(),
                scheme: scheme.to_string(),
            }),
        }
    }
}

async fn tempfile_next_to(target: &Path) -> Result<tempfile::NamedTempFile, FetchError> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).await?;
    Ok(tempfile::NamedTempFile::new_in(&parent)?)
}

async fn stream_file(
    source: &Path,
    mut sink: Option<&mut fs::File>,
    mut hasher: Option<&mut ChecksumHasher>,
    progress: &ProgressTracker,
    cancel: &CancellationToken,
) -> Result<(), FetchError> {
    let mut file = fs::File::open(source).await?;
    let mut buffer = vec![0; READ_BUFFER_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let len = file.read(&mut buffer).await?;
        if len == 0 {
            break;
        }
        if let Some(hasher) = hasher.as_deref_mut() {
            hasher.update(&buffer[..len]);
        }
        if let Some(sink) = sink.as_deref_mut() {
            sink.write_all(&buffer[..len]).await?;
        }
        progress.advance(len as u64);
    }
    Ok(())
}

fn verify(fetch: &ResolvedFetch, hasher: Option<ChecksumHasher>) -> Result<(), FetchError> {
    let (Some(expected), Some(hasher)) = (fetch.checksum(), hasher) else {
        return Ok(());
    };
    let found = hasher.finalize();
    if expected.matches(&found) {
        return Ok(());
    }
    Err(mismatch(fetch, expected, &found))
}

fn mismatch(fetch: &ResolvedFetch, expected: &ExpectedChecksum, found: &[u8]) -> FetchError {
    FetchError::ChecksumMismatch {
        url: fetch.url().clone(),
        kind: expected.kind(),
        expected: expected.to_hex(),
        found: hex::encode(found),
    }
}

use super::monitor::{FetchMonitor, FetchOutcome};
use super::DownloadStepError;
use crate::cache::{CacheError, CacheLock, CacheLockProvider, FileCache};
use crate::checksum::ExpectedChecksum;
use crate::events::event::DownloadEvent;
use crate::events::EventChannel;
use crate::fetch::{DownloadClient, Fetcher, ResolvedFetch};
use crate::pipeline::{StateBag, Step, StepAction};
use crate::{Config, DEFAULT_CANCEL_POLL_INTERVAL, DEFAULT_PROGRESS_INTERVAL};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, instrument};

/// Downloads (or copies) a file from the first of several mirrors that works.
///
/// Mirrors are tried strictly in order, one at a time. A mirror that fails is reported and the
/// next one is tried; a cancelled pipeline stops the step right away. Without an explicit
/// `target_path` the file goes into the shared cache, and the cache lock for the mirror's URL is
/// held for the whole attempt.
///
/// On success the final path is published in the state under `result_key`.
#[derive(Builder, Clone)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct StepDownload {
    /// The hex-encoded checksum the download must have. Empty means no verification.
    #[builder(setter(into), default)]
    checksum: String,

    /// The checksum algorithm. Empty means "infer from the checksum's length".
    #[builder(setter(into), default)]
    checksum_type: String,

    /// A short description of what is being downloaded, such as "ISO" or "Guest Additions".
    #[builder(setter(into))]
    description: String,

    /// The state key the final path is published under.
    #[builder(setter(into))]
    result_key: String,

    /// Where the result should go. Otherwise it goes into the cache.
    #[builder(setter(into, strip_option), default)]
    target_path: Option<PathBuf>,

    /// The mirrors to try, in order.
    #[builder(default)]
    urls: Vec<String>,

    cache: Arc<dyn CacheLockProvider>,

    fetcher: Arc<dyn Fetcher>,

    event_channel: Arc<EventChannel>,

    #[builder(default = "DEFAULT_PROGRESS_INTERVAL")]
    progress_interval: Duration,

    #[builder(default = "DEFAULT_CANCEL_POLL_INTERVAL")]
    cancel_poll_interval: Duration,
}

impl std::fmt::Debug for StepDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDownload")
            .field("description", &self.description)
            .field("result_key", &self.result_key)
            .field("target_path", &self.target_path)
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

impl StepDownload {
    pub fn builder() -> StepDownloadBuilder {
        StepDownloadBuilder::default()
    }

    /// A builder wired to the cache, HTTP client, event channel and intervals of `config`.
    pub fn from_config(config: &Config) -> StepDownloadBuilder {
        Self::builder()
            .cache(Arc::new(FileCache::new(config)))
            .fetcher(Arc::new(DownloadClient::new(config)))
            .event_channel(config.event_channel())
            .progress_interval(config.progress_interval())
            .cancel_poll_interval(config.cancel_poll_interval())
    }

    /// Try a single mirror. The cache lock, if one is needed, lives exactly as long as this call.
    async fn attempt(
        &self,
        url: &str,
        checksum: Option<ExpectedChecksum>,
        state: &StateBag,
    ) -> FetchOutcome {
        self.event_channel.send(DownloadEvent::MirrorStarted {
            url: url.to_string(),
        });

        let (target_path, _lock) = match &self.target_path {
            Some(target_path) => (target_path.clone(), None),
            None => match self.lock_unless_cancelled(url, state).await {
                Some(Ok(lock)) => (lock.path().to_path_buf(), Some(lock)),
                Some(Err(err)) => return FetchOutcome::Failed(err.into()),
                None => {
                    self.event_channel.send(DownloadEvent::DownloadInterrupted {
                        url: url.to_string(),
                    });
                    return FetchOutcome::Cancelled;
                }
            },
        };

        let fetch = match ResolvedFetch::new(url, target_path, checksum) {
            Ok(fetch) => fetch,
            Err(err) => return FetchOutcome::Failed(err),
        };

        FetchMonitor {
            fetcher: self.fetcher.clone(),
            event_channel: &self.event_channel,
            state,
            progress_interval: self.progress_interval,
            cancel_poll_interval: self.cancel_poll_interval,
        }
        .run(fetch)
        .await
    }

    /// Wait for the cache lock on `url`, giving up with `None` once the pipeline is cancelled.
    async fn lock_unless_cancelled(
        &self,
        url: &str,
        state: &StateBag,
    ) -> Option<Result<CacheLock, CacheError>> {
        let lock = self.cache.lock(url);
        tokio::pin!(lock);

        let mut cancel_poll = interval(self.cancel_poll_interval);
        cancel_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                lock = &mut lock => return Some(lock),
                _ = cancel_poll.tick() => {
                    if state.is_cancelled() {
                        debug!("cancellation requested while waiting for the lock on {}", url);
                        return None;
                    }
                }
            }
        }
    }
}

impl StepDownloadBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.progress_interval == Some(Duration::ZERO) {
            return Err("progress_interval must be greater than zero".to_string());
        }
        if self.cancel_poll_interval == Some(Duration::ZERO) {
            return Err("cancel_poll_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl Step for StepDownload {
    fn name(&self) -> &str {
        "download"
    }

    #[instrument(name = "StepDownload::run", skip(self, state), fields(description = %self.description))]
    async fn run(&self, state: &StateBag) -> StepAction {
        let checksum = match ExpectedChecksum::resolve(&self.checksum, &self.checksum_type) {
            Ok(checksum) => checksum,
            Err(err) => {
                let err = DownloadStepError::from(err);
                self.event_channel.send(DownloadEvent::InvalidChecksum {
                    error: err.to_string(),
                });
                state.put_error(err);
                return StepAction::Halt;
            }
        };

        self.event_channel.send(DownloadEvent::DownloadStarted {
            description: self.description.clone(),
        });

        let mut final_path = None;
        for url in &self.urls {
            match self.attempt(url, checksum.clone(), state).await {
                FetchOutcome::Fetched(path) => {
                    final_path = Some(path);
                    break;
                }
                FetchOutcome::Failed(err) => {
                    debug!("mirror {} failed: {:?}", url, err);
                    self.event_channel.send(DownloadEvent::MirrorFailed {
                        url: url.clone(),
                        error: err.to_string(),
                    });
                }
                FetchOutcome::Cancelled => {
                    self.event_channel.send(DownloadEvent::DownloadCancelled {
                        description: self.description.clone(),
                    });
                    return StepAction::Halt;
                }
            }
        }

        let Some(path) = final_path else {
            let err = DownloadStepError::Exhausted {
                description: self.description.clone(),
            };
            self.event_channel.send(DownloadEvent::DownloadFailed {
                description: self.description.clone(),
                error: err.to_string(),
            });
            state.put_error(err);
            return StepAction::Halt;
        };

        self.event_channel.send(DownloadEvent::DownloadCompleted {
            description: self.description.clone(),
            path: path.clone(),
        });
        state.put(self.result_key.clone(), path);
        StepAction::Continue
    }
}

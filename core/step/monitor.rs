use crate::events::event::DownloadEvent;
use crate::events::EventChannel;
use crate::fetch::{FetchError, Fetcher, ProgressSample, ProgressTracker, ResolvedFetch};
use crate::pipeline::StateBag;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// How a single mirror attempt ended.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The file is at this path and verified. Stop trying mirrors.
    Fetched(PathBuf),

    /// This mirror failed. The next one may still work.
    Failed(FetchError),

    /// The pipeline was cancelled. Nothing else should be tried.
    Cancelled,
}

impl FetchOutcome {
    pub fn is_continuable(&self) -> bool {
        !matches!(self, FetchOutcome::Cancelled)
    }
}

/// Runs one [ResolvedFetch] on its own task while watching for progress and cancellation.
pub(crate) struct FetchMonitor<'a> {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) event_channel: &'a EventChannel,
    pub(crate) state: &'a StateBag,
    pub(crate) progress_interval: Duration,
    pub(crate) cancel_poll_interval: Duration,
}

impl<'a> FetchMonitor<'a> {
    #[instrument(name = "FetchMonitor::run", skip(self, fetch), fields(url = %fetch.url()))]
    pub(crate) async fn run(&self, fetch: ResolvedFetch) -> FetchOutcome {
        let url = fetch.url().to_string();

        let progress = ProgressTracker::new();
        let reader = progress.reader();
        let cancel = CancellationToken::new();
        let (done_tx, mut done_rx) = oneshot::channel();

        let fetcher = self.fetcher.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(fetch, progress, task_cancel).await;
            // The receiver is gone if the attempt was cancelled in the meantime.
            let _ = done_tx.send(result);
        });

        let started = Instant::now();
        let mut progress_ticker =
            interval_at(started + self.progress_interval, self.progress_interval);
        progress_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel_poll =
            interval_at(started + self.cancel_poll_interval, self.cancel_poll_interval);
        cancel_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut done_rx => {
                    return match result {
                        Ok(Ok(path)) => FetchOutcome::Fetched(path),
                        Ok(Err(err)) => FetchOutcome::Failed(err),
                        Err(_) => FetchOutcome::Failed(FetchError::Interrupted),
                    };
                }
                _ = progress_ticker.tick() => {
                    if let ProgressSample::Percent(percent) = reader.sample() {
                        self.event_channel.send(DownloadEvent::DownloadProgress {
                            url: url.clone(),
                            percent,
                        });
                    }
                }
                _ = cancel_poll.tick() => {
                    if self.state.is_cancelled() {
                        debug!("cancellation requested, abandoning {}", url);
                        cancel.cancel();
                        self.event_channel.send(DownloadEvent::DownloadInterrupted { url });
                        return FetchOutcome::Cancelled;
                    }
                }
            }
        }
    }
}

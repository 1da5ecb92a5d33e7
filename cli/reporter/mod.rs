use indicatif::{ProgressBar, ProgressStyle};
use mirrorfetch_core::events::event::*;
use mirrorfetch_core::events::{EventChannel, EventConsumer};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

trait Reporter {
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Noop => (),
            Event::DownloadEvent(e) => self.on_download_event(e),
            Event::RunnerEvent(e) => self.on_runner_event(e),
        }
    }

    fn on_download_event(&mut self, _event: DownloadEvent) {}
    fn on_runner_event(&mut self, _event: RunnerEvent) {}
}

/// Prints download events as status lines on stderr, with a progress bar for the running mirror.
pub struct StatusReporter {
    should_stop: bool,
    download_started: Instant,
    event_consumer: EventConsumer,
    pb: ProgressBar,
}

impl StatusReporter {
    pub fn new(event_channel: Arc<EventChannel>) -> StatusReporter {
        let style = ProgressStyle::default_bar()
            .template("{prefix:>12.cyan.bold} [{bar:25}] {pos:>3}% {wide_msg}")
            .progress_chars("=> ");

        let pb = ProgressBar::new(100);
        pb.set_style(style);
        pb.set_prefix("Downloading");

        StatusReporter {
            should_stop: false,
            download_started: Instant::now(),
            event_consumer: event_channel.consumer(),
            pb,
        }
    }

    /// Report events until a [RunnerEvent::Shutdown] comes through.
    pub async fn run(mut self) {
        let handle = std::thread::spawn(move || loop {
            self.event_consumer.fetch();
            match self.event_consumer.pop() {
                Some(event) => {
                    debug!("{:#?}", event);
                    self.handle_event(event)
                }
                None if self.should_stop => break,
                None => std::thread::sleep(Duration::from_millis(10)),
            }
        });
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn print(&self, severity: Severity, label: &str, message: impl Display) {
        let style = match severity {
            Severity::Status => console::Style::new().green().bold(),
            Severity::Info => console::Style::new().blue(),
            Severity::Error => console::Style::new().red().bold(),
        };
        let line = format!("{:>12} {}", style.apply_to(label), message);
        if self.pb.is_hidden() {
            eprintln!("{}", line);
        } else {
            self.pb.println(line);
        }
    }
}

impl Reporter for StatusReporter {
    fn on_download_event(&mut self, event: DownloadEvent) {
        let severity = Event::from(event.clone()).severity();

        match event {
            DownloadEvent::DownloadStarted { description } => {
                self.download_started = Instant::now();
                self.print(severity, "Downloading", &description);
            }
            DownloadEvent::MirrorStarted { url } => {
                self.pb.set_position(0);
                self.pb.set_message(url.clone());
                self.print(severity, "Trying", url);
            }
            DownloadEvent::DownloadProgress { percent, .. } => {
                self.pb.set_position(u64::from(percent));
            }
            DownloadEvent::MirrorFailed { url, error } => {
                self.print(severity, "Skipping", format!("{} ({})", url, error));
            }
            DownloadEvent::DownloadInterrupted { url } => {
                self.print(severity, "Interrupted", url);
            }
            DownloadEvent::DownloadCancelled { description } => {
                self.pb.finish_and_clear();
                self.print(severity, "Cancelled", description);
            }
            DownloadEvent::DownloadCompleted { description, path } => {
                self.pb.finish_and_clear();
                self.print(
                    severity,
                    "Finished",
                    format!(
                        "{} in {}ms -> {}",
                        description,
                        self.download_started.elapsed().as_millis(),
                        path.display()
                    ),
                );
            }
            DownloadEvent::DownloadFailed { error, .. } => {
                self.pb.finish_and_clear();
                self.print(severity, "Failed", error);
            }
            DownloadEvent::InvalidChecksum { error } => {
                self.print(severity, "Error", error);
            }
        }
    }

    fn on_runner_event(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::StepStarted { step } => debug!("step {} started", step),
            RunnerEvent::StepCompleted { step, action } => {
                debug!("step {} completed with {:?}", step, action)
            }
            RunnerEvent::PipelineCancelled => {
                let severity = Event::from(RunnerEvent::PipelineCancelled).severity();
                self.print(severity, "Cancelled", "nothing else will run");
            }
            RunnerEvent::Shutdown => {
                self.pb.finish_and_clear();
                self.should_stop = true;
            }
        }
    }
}

use super::*;
use crate::reporter::StatusReporter;
use anyhow::{anyhow, bail};
use mirrorfetch_core::events::event::RunnerEvent;
use mirrorfetch_core::pipeline::{BasicRunner, StateBag, StepAction};
use mirrorfetch_core::step::StepDownload;
use mirrorfetch_core::Config;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::debug;

/// The state key the downloaded file's path is published under.
pub const ARTIFACT_PATH_KEY: &str = "artifact_path";

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "download",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Download a file from the first mirror that works",
)]
pub struct DownloadCommand {
    #[structopt(
        help = r"The mirrors to try, in order.

Each one is an http(s) URL, a file:// URL, or a local path.

Example: https://mirror.example.com/images/install.iso
",
        required = true,
        min_values = 1
    )]
    urls: Vec<String>,

    #[structopt(
        help = r"The hex-encoded checksum the file must have. Leave empty to skip verification.",
        long = "checksum",
        default_value = ""
    )]
    checksum: String,

    #[structopt(
        help = r"One of md5, sha1, sha256, sha512 or none. Inferred from the checksum if empty.",
        long = "checksum-type",
        default_value = ""
    )]
    checksum_type: String,

    #[structopt(
        help = r"What is being downloaded, used in status messages.",
        long = "description",
        default_value = "file"
    )]
    description: String,

    #[structopt(
        help = r"Where to put the file. If missing, the file goes into the download cache.",
        long = "target-path"
    )]
    target_path: Option<PathBuf>,

    #[structopt(flatten)]
    flags: Flags,
}

impl DownloadCommand {
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let config = Config::try_from(self.flags.clone())?;

        let mut step = StepDownload::from_config(&config)
            .description(self.description.clone())
            .result_key(ARTIFACT_PATH_KEY)
            .checksum(self.checksum)
            .checksum_type(self.checksum_type)
            .urls(self.urls);
        if let Some(target_path) = self.target_path {
            step = step.target_path(target_path);
        }
        let runner = BasicRunner::new(config.event_channel()).step(step.build()?);

        let state = StateBag::new();
        let canceller = state.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received Ctrl-C, cancelling the download");
                canceller.cancel();
            }
        });

        let reporter = StatusReporter::new(config.event_channel());
        let ec = config.event_channel();

        let (action, _) = futures::future::join(
            async {
                let action = runner.run(&state).await;
                ec.send(RunnerEvent::Shutdown);
                action
            },
            reporter.run(),
        )
        .await;

        ctrl_c.abort();

        let path = outcome(action, &state, &self.description)?;
        println!("{}", path.display());
        Ok(())
    }
}

/// What the command reports once the runner is done. A published path wins over a Ctrl-C that
/// arrived after the download finished.
fn outcome(
    action: StepAction,
    state: &StateBag,
    description: &str,
) -> Result<PathBuf, anyhow::Error> {
    if let (StepAction::Continue, Some(path)) = (action, state.path(ARTIFACT_PATH_KEY)) {
        return Ok(path);
    }

    if let Some(err) = state.error() {
        return Err(anyhow!("{}", err));
    }

    if state.is_cancelled() {
        bail!("{} download interrupted", description);
    }

    bail!("{} download failed.", description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_late_ctrl_c_does_not_hide_a_finished_download() {
        let state = StateBag::new();
        state.put(ARTIFACT_PATH_KEY, PathBuf::from("/cache/x.iso"));
        state.cancel();

        let path = outcome(StepAction::Continue, &state, "ISO").unwrap();
        assert_eq!(path, PathBuf::from("/cache/x.iso"));
    }

    #[test]
    fn a_cancelled_download_is_interrupted() {
        let state = StateBag::new();
        state.cancel();

        let err = outcome(StepAction::Halt, &state, "ISO").unwrap_err();
        assert_eq!(err.to_string(), "ISO download interrupted");
    }

    #[test]
    fn step_errors_are_reported_as_is() {
        let state = StateBag::new();
        state.put_error(std::io::Error::new(
            std::io::ErrorKind::Other,
            "ISO download failed.",
        ));

        let err = outcome(StepAction::Halt, &state, "ISO").unwrap_err();
        assert_eq!(err.to_string(), "ISO download failed.");
    }
}

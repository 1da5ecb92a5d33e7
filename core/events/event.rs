use crate::pipeline::StepAction;
use std::path::PathBuf;

/// How loudly an event should be presented to a human.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// A headline: something started or finished.
    Status,

    /// Supporting detail, such as which mirror is being tried.
    Info,

    /// Something went wrong and the pipeline will stop because of it.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DownloadEvent {
    DownloadStarted {
        description: String,
    },
    MirrorStarted {
        url: String,
    },
    DownloadProgress {
        url: String,
        percent: u8,
    },
    MirrorFailed {
        url: String,
        error: String,
    },
    DownloadInterrupted {
        url: String,
    },
    DownloadCancelled {
        description: String,
    },
    DownloadCompleted {
        description: String,
        path: PathBuf,
    },
    DownloadFailed {
        description: String,
        error: String,
    },
    InvalidChecksum {
        error: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunnerEvent {
    StepStarted { step: String },
    StepCompleted { step: String, action: StepAction },
    PipelineCancelled,
    Shutdown,
}

#[derive(Default, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    /// The "nothing happened" event.
    #[default]
    Noop,
    DownloadEvent(DownloadEvent),
    RunnerEvent(RunnerEvent),
}

impl Event {
    pub fn severity(&self) -> Severity {
        match self {
            Event::DownloadEvent(DownloadEvent::DownloadStarted { .. })
            | Event::DownloadEvent(DownloadEvent::DownloadInterrupted { .. })
            | Event::DownloadEvent(DownloadEvent::DownloadCompleted { .. })
            | Event::RunnerEvent(RunnerEvent::PipelineCancelled) => Severity::Status,
            Event::DownloadEvent(DownloadEvent::DownloadFailed { .. })
            | Event::DownloadEvent(DownloadEvent::InvalidChecksum { .. }) => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl From<DownloadEvent> for Event {
    fn from(value: DownloadEvent) -> Self {
        Event::DownloadEvent(value)
    }
}

impl From<RunnerEvent> for Event {
    fn from(value: RunnerEvent) -> Self {
        Event::RunnerEvent(value)
    }
}

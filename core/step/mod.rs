//! # Download Step
//!
//! [StepDownload] is the pipeline step that acquires a single artifact from a list of mirrors.
//!
mod download;
mod error;
mod monitor;

pub use download::*;
pub use error::*;
pub use monitor::FetchOutcome;

use crate::checksum::ChecksumError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadStepError {
    #[error(transparent)]
    InvalidChecksum(ChecksumError),

    #[error("{description} download failed.")]
    Exhausted { description: String },
}

impl From<ChecksumError> for DownloadStepError {
    fn from(value: ChecksumError) -> Self {
        DownloadStepError::InvalidChecksum(value)
    }
}

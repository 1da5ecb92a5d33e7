use crate::cache::CacheError;
use crate::checksum::ChecksumType;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Could not parse {url:?} as a URL: {err}")]
    InvalidUrl { url: String, err: url::ParseError },

    #[error("Don't know how to download {url} (unsupported scheme {scheme:?})")]
    UnsupportedScheme { url: Url, scheme: String },

    #[error("{url} does not point to a local file")]
    InvalidFilePath { url: Url },

    #[error("Could not download URL {url} due to: {status}")]
    DownloadFailed {
        url: Url,
        status: reqwest::StatusCode,
    },

    #[error(
        r#"The file we tried to download had a different {kind} than what we expected. Is the checksum wrong?

We expected "{expected}"

But found "{found}"
"#
    )]
    ChecksumMismatch {
        url: Url,
        kind: ChecksumType,
        expected: String,
        found: String,
    },

    #[error("The download was cancelled")]
    Cancelled,

    #[error("The download stopped before reporting a result")]
    Interrupted,

    #[error(transparent)]
    CacheError(CacheError),

    #[error(transparent)]
    RequestError(reqwest::Error),

    #[error(transparent)]
    IoError(std::io::Error),
}

impl From<CacheError> for FetchError {
    fn from(value: CacheError) -> Self {
        FetchError::CacheError(value)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        FetchError::RequestError(value)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(value: std::io::Error) -> Self {
        FetchError::IoError(value)
    }
}

impl From<tempfile::PersistError> for FetchError {
    fn from(value: tempfile::PersistError) -> Self {
        FetchError::IoError(value.error)
    }
}

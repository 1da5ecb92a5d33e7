use crate::events::EventChannel;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::*;

/// Environment variable that overrides the default cache directory.
pub const CACHE_DIR_ENV: &str = "MIRRORFETCH_CACHE_DIR";

/// How often a running download reports its progress.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// How often a running download checks whether the pipeline was cancelled.
pub const DEFAULT_CANCEL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A collection of options that affect how downloads are performed. This is not specific to a
/// single download, it is shared by every step built from it.
///
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate", error = "ConfigError"))]
pub struct Config {
    /// The directory where downloads without an explicit target path are cached.
    #[builder(setter(into), default = "self.default_cache_root()")]
    cache_root: PathBuf,

    /// Interval between two progress reports of a running download.
    #[builder(default = "DEFAULT_PROGRESS_INTERVAL")]
    progress_interval: Duration,

    /// Interval between two cancellation checks of a running download. This bounds how long it
    /// takes to notice a cancelled pipeline.
    #[builder(default = "DEFAULT_CANCEL_POLL_INTERVAL")]
    cancel_poll_interval: Duration,

    /// Copy `file://` sources into the target path instead of using them in place.
    #[builder(default = "false")]
    copy_local_files: bool,

    /// The HTTP Client to be used across the application.
    /// NOTE: this is safe to clone since it is really an [Arc] to a client pool.
    #[builder(default = "self.default_http_client()")]
    http_client: reqwest::Client,

    /// The Event Channel be used across the application.
    #[builder(default = "self.default_event_channel()")]
    event_channel: Arc<EventChannel>,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("the default configuration is always valid")
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn cache_root(&self) -> &PathBuf {
        &self.cache_root
    }

    pub fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    pub fn cancel_poll_interval(&self) -> Duration {
        self.cancel_poll_interval
    }

    pub fn copy_local_files(&self) -> bool {
        self.copy_local_files
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn event_channel(&self) -> Arc<EventChannel> {
        self.event_channel.clone()
    }
}

impl ConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.progress_interval == Some(Duration::ZERO) {
            return Err("progress_interval must be greater than zero".to_string());
        }
        if self.cancel_poll_interval == Some(Duration::ZERO) {
            return Err("cancel_poll_interval must be greater than zero".to_string());
        }
        Ok(())
    }

    fn default_cache_root(&self) -> PathBuf {
        let from_env = std::env::var(CACHE_DIR_ENV).ok();
        if let Some(root) = from_env.filter(|root| !root.is_empty()) {
            return PathBuf::from(root);
        }

        directories::ProjectDirs::from("build", "mirrorfetch", "mirrorfetch")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("mirrorfetch"))
    }

    fn default_http_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    fn default_event_channel(&self) -> Arc<EventChannel> {
        EventChannel::new().into()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Attempted to build a Config struct while missing fields: {0:?}")]
    BuilderError(derive_builder::UninitializedFieldError),
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        Self::BuilderError(err)
    }
}

impl From<String> for ConfigError {
    fn from(err: String) -> Self {
        Self::ValidationError(err)
    }
}

use dashmap::DashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The key a pipeline is cancelled under.
pub const STATE_CANCELLED: &str = "cancelled";

/// The key a halting step publishes its error under.
pub const STATE_ERROR: &str = "error";

#[derive(Debug, Clone)]
pub enum StateValue {
    Path(PathBuf),
    Flag(bool),
    Error(Arc<dyn Error + Send + Sync>),
}

impl StateValue {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            StateValue::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Arc<dyn Error + Send + Sync>> {
        match self {
            StateValue::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathBuf> for StateValue {
    fn from(value: PathBuf) -> Self {
        StateValue::Path(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Flag(value)
    }
}

/// The state shared by every step of a pipeline run.
///
/// Cloning a `StateBag` clones a handle: every clone sees the same values. This is how a signal
/// handler on another task can cancel a pipeline that is in the middle of a download.
#[derive(Debug, Clone, Default)]
pub struct StateBag {
    values: Arc<DashMap<String, StateValue>>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.values.get(key).map(|value| value.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn put<V>(&self, key: impl Into<String>, value: V)
    where
        V: Into<StateValue>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key)
            .and_then(|value| value.as_path().map(Path::to_path_buf))
    }

    pub fn put_error<E>(&self, err: E)
    where
        E: Error + Send + Sync + 'static,
    {
        self.values
            .insert(STATE_ERROR.to_string(), StateValue::Error(Arc::new(err)));
    }

    pub fn error(&self) -> Option<Arc<dyn Error + Send + Sync>> {
        self.get(STATE_ERROR)
            .and_then(|value| value.as_error().cloned())
    }

    /// Ask every step of the pipeline to stop as soon as it can.
    pub fn cancel(&self) {
        self.put(STATE_CANCELLED, true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.contains(STATE_CANCELLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn values_are_shared_between_clones() {
        let state = StateBag::new();
        let other = state.clone();

        other.put("iso_path", PathBuf::from("/cache/x.iso"));

        assert!(state.contains("iso_path"));
        assert_eq!(state.path("iso_path"), Some(PathBuf::from("/cache/x.iso")));
    }

    #[test]
    fn cancellation_is_visible_through_every_handle() {
        let state = StateBag::new();
        assert!(!state.is_cancelled());

        state.clone().cancel();

        assert!(state.is_cancelled());
    }

    #[test]
    fn errors_are_published_under_the_error_key() {
        let state = StateBag::new();
        assert!(state.error().is_none());

        state.put_error(Boom);

        assert!(state.contains(STATE_ERROR));
        assert_eq!(state.error().unwrap().to_string(), "boom");
    }

    #[test]
    fn path_ignores_values_of_other_kinds() {
        let state = StateBag::new();
        state.put("headless", true);
        assert!(state.path("headless").is_none());
        assert_matches!(state.get("headless"), Some(StateValue::Flag(true)));
    }
}

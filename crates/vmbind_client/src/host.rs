use serde_json::{Map, Value};

/// Name of the nested state bucket used when a view model is connected with `use_state`.
pub const STATE_BUCKET: &str = "state";

/// Reactive property observed by a watcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WatchPath {
    /// Top-level data property.
    Root(String),
    /// Property inside the nested state bucket.
    State(String),
}

impl WatchPath {
    pub fn new(property: &str, nested: bool) -> Self {
        if nested {
            Self::State(property.to_string())
        } else {
            Self::Root(property.to_string())
        }
    }

    pub fn property(&self) -> &str {
        match self {
            Self::Root(name) | Self::State(name) => name,
        }
    }
}

impl std::fmt::Display for WatchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root(name) => write!(f, "{}", name),
            Self::State(name) => write!(f, "{}.{}", STATE_BUCKET, name),
        }
    }
}

/// Callback receiving the new value of a watched property.
pub type WatchCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// Keeps a watcher installed; [`stop`](Self::stop) removes it.
pub struct WatchHandle {
    stop: Box<dyn FnOnce() + Send + Sync>,
}

impl WatchHandle {
    pub fn new(stop: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { stop: Box::new(stop) }
    }

    pub fn stop(self) {
        (self.stop)();
    }
}

/// The UI-framework side of a bound component: its declared properties, its
/// local reactive data and an optional nested state bucket.
///
/// Implemented once per UI framework (see [`LeptosHost`](crate::LeptosHost)).
///
/// Watchers must be notified synchronously from the setters, and only when
/// the value actually changes. The connector relies on this to tell server
/// writes apart from UI writes.
pub trait ReactiveHost: Send + Sync {
    /// Declared input properties (read-only).
    fn props(&self) -> Map<String, Value>;

    /// Snapshot of the top-level data properties.
    fn data(&self) -> Map<String, Value>;

    /// Whether `key` is a declared top-level data property.
    fn has_property(&self, key: &str) -> bool;

    /// Writes a declared top-level data property.
    fn set_property(&self, key: &str, value: Value);

    /// Snapshot of the nested state bucket, `None` when the component does not declare one.
    fn state_bucket(&self) -> Option<Map<String, Value>>;

    /// Writes a property in the nested state bucket, creating it (reactively)
    /// when absent. No-op when there is no bucket.
    fn set_state_property(&self, key: &str, value: Value);

    /// Installs a watcher on `path`.
    fn watch(&self, path: WatchPath, callback: WatchCallback) -> WatchHandle;

    fn has_state_bucket(&self) -> bool {
        self.state_bucket().is_some()
    }
}

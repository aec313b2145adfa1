use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use leptos::prelude::*;
use serde_json::{Map, Value};

use crate::host::{ReactiveHost, STATE_BUCKET, WatchCallback, WatchHandle, WatchPath};
use crate::{lock, read};

struct Watcher {
    id: u64,
    path: WatchPath,
    callback: Arc<dyn Fn(&Value) + Send + Sync>,
}

struct LeptosHostInner {
    props: Map<String, Value>,
    data: RwLock<BTreeMap<String, ArcRwSignal<Value>>>,
    state: Option<ArcRwSignal<Map<String, Value>>>,
    watchers: Mutex<Vec<Watcher>>,
    next_watch_id: AtomicU64,
}

/// [`ReactiveHost`] backed by Leptos signals.
///
/// Every declared data property is an `ArcRwSignal<Value>`, the optional
/// state bucket is one `ArcRwSignal` holding a map. Views read through
/// [`get`](Self::get) / [`state_value`](Self::state_value) (tracked) and write
/// through [`set`](Self::set) / [`set_state_value`](Self::set_state_value),
/// which notify watchers synchronously.
///
/// # Example
///
/// ```rust,ignore
/// let host = LeptosHost::builder()
///     .prop("title", json!("Hello"))
///     .data("Greeting", Value::Null)
///     .build();
///
/// view! { <p>{move || host.get("Greeting").to_string()}</p> }
/// ```
#[derive(Clone)]
pub struct LeptosHost {
    inner: Arc<LeptosHostInner>,
}

/// Builder for [`LeptosHost`].
#[derive(Default)]
pub struct LeptosHostBuilder {
    props: Map<String, Value>,
    data: Map<String, Value>,
    state: Option<Map<String, Value>>,
}

impl LeptosHostBuilder {
    pub fn prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Declares a top-level data property with its initial value.
    pub fn data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Declares an empty nested state bucket.
    pub fn state_bucket(mut self) -> Self {
        self.state.get_or_insert_with(Map::new);
        self
    }

    pub fn build(self) -> LeptosHost {
        let data = self
            .data
            .into_iter()
            .map(|(key, value)| (key, ArcRwSignal::new(value)))
            .collect();

        LeptosHost {
            inner: Arc::new(LeptosHostInner {
                props: self.props,
                data: RwLock::new(data),
                state: self.state.map(ArcRwSignal::new),
                watchers: Mutex::new(Vec::new()),
                next_watch_id: AtomicU64::new(0),
            }),
        }
    }
}

impl LeptosHost {
    pub fn builder() -> LeptosHostBuilder {
        LeptosHostBuilder::default()
    }

    /// Host over component data such as [`ComponentDescriptor::data`](crate::ComponentDescriptor::data):
    /// an object under [`STATE_BUCKET`] becomes the state bucket, every other
    /// entry a data property.
    pub fn from_data(data: Map<String, Value>) -> Self {
        let mut builder = Self::builder();
        for (key, value) in data {
            match value {
                Value::Object(bucket) if key == STATE_BUCKET => builder.state = Some(bucket),
                value => builder = builder.data(key, value),
            }
        }
        builder.build()
    }

    fn rw_signal(&self, key: &str) -> Option<ArcRwSignal<Value>> {
        read(&self.inner.data).get(key).cloned()
    }

    /// Read-only signal of a declared data property.
    ///
    /// Writes must go through [`set`](Self::set) so that watchers see them.
    pub fn signal(&self, key: &str) -> Option<ArcReadSignal<Value>> {
        self.rw_signal(key).map(|s| s.read_only())
    }

    /// Tracked read of a data property; `Null` when undeclared.
    pub fn get(&self, key: &str) -> Value {
        self.rw_signal(key).map(|s| s.get()).unwrap_or(Value::Null)
    }

    /// UI-side write of a data property.
    pub fn set(&self, key: &str, value: Value) {
        self.set_property(key, value);
    }

    /// Tracked read of a state bucket property; `Null` when absent.
    pub fn state_value(&self, key: &str) -> Value {
        match &self.inner.state {
            Some(state) => state.with(|bucket| bucket.get(key).cloned().unwrap_or(Value::Null)),
            None => Value::Null,
        }
    }

    /// UI-side write of a state bucket property.
    pub fn set_state_value(&self, key: &str, value: Value) {
        self.set_state_property(key, value);
    }

    fn notify(&self, path: &WatchPath, value: &Value) {
        let callbacks: Vec<_> = lock(&self.inner.watchers)
            .iter()
            .filter(|w| &w.path == path)
            .map(|w| w.callback.clone())
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

impl ReactiveHost for LeptosHost {
    fn props(&self) -> Map<String, Value> {
        self.inner.props.clone()
    }

    fn data(&self) -> Map<String, Value> {
        read(&self.inner.data)
            .iter()
            .map(|(key, signal)| (key.clone(), signal.get_untracked()))
            .collect()
    }

    fn has_property(&self, key: &str) -> bool {
        read(&self.inner.data).contains_key(key)
    }

    fn set_property(&self, key: &str, value: Value) {
        let Some(signal) = self.rw_signal(key) else {
            return;
        };
        if signal.with_untracked(|current| *current == value) {
            return;
        }
        signal.set(value.clone());
        self.notify(&WatchPath::Root(key.to_string()), &value);
    }

    fn state_bucket(&self) -> Option<Map<String, Value>> {
        self.inner.state.as_ref().map(|state| state.get_untracked())
    }

    fn set_state_property(&self, key: &str, value: Value) {
        let Some(state) = &self.inner.state else {
            return;
        };
        if state.with_untracked(|bucket| bucket.get(key) == Some(&value)) {
            return;
        }
        state.update(|bucket| {
            bucket.insert(key.to_string(), value.clone());
        });
        self.notify(&WatchPath::State(key.to_string()), &value);
    }

    fn watch(&self, path: WatchPath, callback: WatchCallback) -> WatchHandle {
        let id = self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.watchers).push(Watcher {
            id,
            path,
            callback: Arc::from(callback),
        });

        let inner = Arc::downgrade(&self.inner);
        WatchHandle::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.watchers).retain(|w| w.id != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recording_watch(host: &LeptosHost, path: WatchPath) -> (Arc<Mutex<Vec<Value>>>, WatchHandle) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = host.watch(path, Box::new(move |v| sink.lock().unwrap().push(v.clone())));
        (seen, handle)
    }

    #[test]
    fn test_set_declared_property_notifies_once_per_change() {
        let host = LeptosHost::builder().data("Count", json!(0)).build();
        let (seen, _handle) = recording_watch(&host, WatchPath::Root("Count".into()));

        host.set("Count", json!(1));
        host.set("Count", json!(1));
        host.set("Count", json!(2));

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(host.signal("Count").unwrap().get_untracked(), json!(2));
    }

    #[test]
    fn test_signal_follows_watched_writes() {
        let host = LeptosHost::builder().data("Name", Value::Null).build();
        let (seen, _handle) = recording_watch(&host, WatchPath::Root("Name".into()));
        let name: ArcReadSignal<Value> = host.signal("Name").unwrap();

        host.set("Name", json!("Ada"));

        assert_eq!(name.get_untracked(), json!("Ada"));
        assert_eq!(*seen.lock().unwrap(), vec![json!("Ada")]);
        assert!(host.signal("Missing").is_none());
    }

    #[test]
    fn test_undeclared_property_is_ignored() {
        let host = LeptosHost::builder().build();
        host.set_property("Missing", json!(1));
        assert!(!host.has_property("Missing"));
        assert!(host.data().is_empty());
    }

    #[test]
    fn test_state_bucket_creates_properties() {
        let host = LeptosHost::builder().state_bucket().build();
        let (seen, _handle) = recording_watch(&host, WatchPath::State("Name".into()));

        host.set_state_property("Name", json!("Ada"));

        assert_eq!(host.state_bucket().unwrap()["Name"], json!("Ada"));
        assert_eq!(*seen.lock().unwrap(), vec![json!("Ada")]);
    }

    #[test]
    fn test_no_bucket_without_declaration() {
        let host = LeptosHost::builder().data("x", json!(1)).build();
        assert!(!host.has_state_bucket());
        host.set_state_property("x", json!(2));
        assert!(host.state_bucket().is_none());
    }

    #[test]
    fn test_from_descriptor_data() {
        let host = LeptosHost::from_data(
            json!({ "state": { "Name": null }, "Title": "x" })
                .as_object()
                .cloned()
                .unwrap(),
        );

        assert!(host.has_state_bucket());
        assert!(host.state_bucket().unwrap().contains_key("Name"));
        assert!(host.has_property("Title"));
        assert!(!host.has_property("state"));
    }

    #[test]
    fn test_stopped_watcher_is_silent() {
        let host = LeptosHost::builder().data("x", json!(0)).build();
        let (seen, handle) = recording_watch(&host, WatchPath::Root("x".into()));

        handle.stop();
        host.set("x", json!(5));

        assert!(seen.lock().unwrap().is_empty());
    }
}

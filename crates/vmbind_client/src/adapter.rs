use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};

use crate::host::ReactiveHost;

/// What a view model needs from the component it is bound to.
pub trait ComponentAdapter: Send + Sync {
    /// Declared input properties of the component.
    fn props(&self) -> Map<String, Value>;

    /// Current component state.
    fn state(&self) -> Map<String, Value>;

    /// Writes each key of `partial` into the component state.
    fn set_state(&self, partial: Map<String, Value>);
}

/// [`ComponentAdapter`] over any [`ReactiveHost`].
///
/// With nested state enabled, server state lives in the host's state bucket
/// and `state()` is the host data overlaid with the bucket. Otherwise it is
/// written straight onto declared data properties.
pub struct HostAdapter {
    vm_id: String,
    host: Arc<dyn ReactiveHost>,
    use_state: Arc<AtomicBool>,
}

impl HostAdapter {
    /// `use_state` is shared with the view model, which owns the flag.
    pub fn new(vm_id: impl Into<String>, host: Arc<dyn ReactiveHost>, use_state: Arc<AtomicBool>) -> Self {
        Self {
            vm_id: vm_id.into(),
            host,
            use_state,
        }
    }

    fn nested(&self) -> bool {
        self.use_state.load(Ordering::Acquire)
    }
}

impl ComponentAdapter for HostAdapter {
    fn props(&self) -> Map<String, Value> {
        self.host.props()
    }

    fn state(&self) -> Map<String, Value> {
        let mut state = self.host.data();
        if self.nested()
            && let Some(bucket) = self.host.state_bucket()
        {
            state.extend(bucket);
        }
        state
    }

    fn set_state(&self, partial: Map<String, Value>) {
        let nested = self.nested();
        let bucket = if nested { self.host.state_bucket() } else { None };

        for (key, value) in partial {
            if nested {
                let declared = bucket.as_ref().is_some_and(|b| b.contains_key(&key));
                if declared || !value.is_null() {
                    self.host.set_state_property(&key, value);
                }
            } else if self.host.has_property(&key) {
                self.host.set_property(&key, value);
            } else if !value.is_null() {
                leptos::logging::error!(
                    "[{}] '{}' is received, but the component doesn't declare the property.",
                    self.vm_id,
                    key
                );
            }
        }
    }
}

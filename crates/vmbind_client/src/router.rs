//! URL router.
//!
//! The router owns the URL path being routed and a [`RouteAdapter`] (route
//! table plus session history). Redirects first offer the URL to the active
//! view models and only fall back to a full page navigation when none of them
//! can serve it.
//!
//! # Lifecycle
//!
//! `Uninitialized` -> `Active` once [`Router::init`] succeeds. `push_state` and
//! `redirect` are meant for an active router; they are not validated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::BindError;
use crate::location::{History, Navigator};
use crate::lock;
use crate::route_table::{RouteParams, RouteTable};

type UrlOverride = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Something that may be able to serve a URL without a page load,
/// typically a view model with its own routes.
pub trait RouteTarget {
    /// Tries to route the router's current URL path. Returns `true` when handled.
    fn route_url(&self, router: &Router) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterState {
    Uninitialized,
    Active,
}

/// Route table bound to a session history.
#[derive(Clone)]
pub struct RouteAdapter {
    table: RouteTable,
    history: Arc<dyn History>,
}

impl RouteAdapter {
    pub fn new(history: Arc<dyn History>) -> Self {
        Self {
            table: RouteTable::new(),
            history,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Pushes `path` to the history and dispatches it through the table.
    fn push_state(&self, state: &Value, title: &str, path: &str) {
        self.history.push_state(state, title, path);
        self.table.dispatch(path);
    }
}

pub struct Router {
    adapter: Option<RouteAdapter>,
    navigator: Arc<dyn Navigator>,
    url_path: Mutex<String>,
    state: Mutex<RouterState>,
    url_override: Mutex<Option<UrlOverride>>,
    debug: AtomicBool,
}

impl Router {
    /// Creates a router; the routed path starts as the navigator's current pathname.
    pub fn new(adapter: Option<RouteAdapter>, navigator: Arc<dyn Navigator>) -> Self {
        let url_path = navigator.pathname();
        Self {
            adapter,
            navigator,
            url_path: Mutex::new(url_path),
            state: Mutex::new(RouterState::Uninitialized),
            url_override: Mutex::new(None),
            debug: AtomicBool::new(false),
        }
    }

    /// Router over `window.history` and `window.location`.
    pub fn browser() -> Self {
        use crate::location::BrowserLocation;
        Self::new(
            Some(RouteAdapter::new(Arc::new(BrowserLocation))),
            Arc::new(BrowserLocation),
        )
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub fn state(&self) -> RouterState {
        *lock(&self.state)
    }

    /// Path that will be parsed on the next routing pass.
    pub fn url_path(&self) -> String {
        lock(&self.url_path).clone()
    }

    /// Starts listening to history navigation.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Configuration`] when the router has no route adapter.
    pub fn init(&self) -> Result<(), BindError> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| BindError::Configuration("a route adapter is required for routing".to_string()))?;

        let mut state = lock(&self.state);
        if *state == RouterState::Active {
            return Ok(());
        }

        let table = adapter.table.clone();
        adapter.history.listen(Box::new(move |path: String| {
            table.dispatch(&path);
        }));
        *state = RouterState::Active;
        Ok(())
    }

    /// Maps a route pattern to an action. No-op without a route adapter.
    pub fn map_to(&self, pattern: &str, handler: impl Fn(&RouteParams) + Send + Sync + 'static) {
        if let Some(adapter) = &self.adapter {
            adapter.table.map(pattern, handler);
        }
    }

    /// Matches `url_path` to a route and runs its action. Returns whether a
    /// route matched.
    pub fn match_url(&self, url_path: &str) -> bool {
        let Some(adapter) = &self.adapter else {
            return false;
        };
        match adapter.table.find(url_path) {
            Some(matched) => {
                matched.run();
                true
            }
            None => false,
        }
    }

    /// Installs a hook that rewrites a URL before routing.
    pub fn set_url_override(&self, hook: impl Fn(&str, &str) -> String + Send + Sync + 'static) {
        *lock(&self.url_override) = Some(Arc::new(hook));
    }

    /// Rewrites `url` for the given target selector. Passes through by default.
    pub fn override_url(&self, url: &str, target_selector: &str) -> String {
        let hook = lock(&self.url_override).clone();
        match hook {
            Some(hook) => hook(url, target_selector),
            None => url.to_string(),
        }
    }

    /// Pushes a history entry without a page load.
    pub fn push_state(&self, state: &Value, title: &str, path: &str) {
        lock(&self.url_path).clear();
        if let Some(adapter) = &self.adapter {
            adapter.push_state(state, title, path);
        }
    }

    /// Redirects to `url`.
    ///
    /// Each target is asked in order whether it can route the URL itself; the
    /// first that does ends the redirect. Callers pass targets in priority
    /// order. When none can, a full page navigation to `url` is performed.
    /// Returns `true` when a target handled the URL.
    pub fn redirect(&self, url: &str, targets: &[&dyn RouteTarget]) -> bool {
        *lock(&self.url_path) = url.to_string();

        for target in targets {
            if target.route_url(self) {
                if self.debug.load(Ordering::Relaxed) {
                    leptos::logging::log!("router> redirected");
                }
                return true;
            }
        }

        self.navigator.replace(url);
        false
    }

    /// Called once the owning view model is ready: routes the current URL
    /// path, or the navigator's pathname when nothing is pending.
    pub fn ready(&self) -> bool {
        self.match_url(&self.current_path())
    }

    /// The pending URL path, or the navigator's pathname when nothing is pending.
    pub fn current_path(&self) -> String {
        let pending = self.url_path();
        if pending.is_empty() {
            self.navigator.pathname()
        } else {
            pending
        }
    }
}

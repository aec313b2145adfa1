use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::{Map, Value};
use vmbind_common::{DisposeVm, HubClientMessage, RequestVm, ServerException, UpdateVm};

use crate::adapter::ComponentAdapter;
use crate::connector::ConnectorInner;
use crate::host::WatchHandle;
use crate::lock;
use crate::route_table::{RouteParams, RouteTable};
use crate::router::{RouteTarget, Router};

/// Callback for exceptions raised by the server-side view model.
pub type ExceptionHandler = Arc<dyn Fn(&ServerException) + Send + Sync>;

/// Options for [`Connector::connect`](crate::Connector::connect).
#[derive(Clone, Default)]
pub struct ConnectOptions {
    /// Place server state in the component's nested state bucket instead of
    /// its top-level data properties.
    pub use_state: bool,
    /// Properties whose local changes are dispatched back to the server.
    pub watch: Vec<String>,
    /// Argument sent with the initial view-model request.
    pub vm_arg: Option<Value>,
    pub exception_handler: Option<ExceptionHandler>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_state(mut self, use_state: bool) -> Self {
        self.use_state = use_state;
        self
    }

    pub fn watch<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn vm_arg(mut self, vm_arg: Value) -> Self {
        self.vm_arg = Some(vm_arg);
        self
    }

    pub fn exception_handler(mut self, handler: impl Fn(&ServerException) + Send + Sync + 'static) -> Self {
        self.exception_handler = Some(Arc::new(handler));
        self
    }
}

/// Suspends outbound dispatch of watched properties for as long as it lives.
///
/// Returned by [`ViewModel::suspend_server_update`]; restores the previous
/// state of the flag when dropped.
pub struct ServerUpdateGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl Drop for ServerUpdateGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::Release);
    }
}

/// A component bound to one server-side view model.
///
/// Created by [`Connector::connect`](crate::Connector::connect) and registered
/// under its id until [`destroy`](Self::destroy) is called.
pub struct ViewModel {
    id: String,
    adapter: Arc<dyn ComponentAdapter>,
    options: ConnectOptions,
    owner: Weak<ConnectorInner>,
    use_state: Arc<AtomicBool>,
    server_update: AtomicBool,
    requested: AtomicBool,
    ready: AtomicBool,
    destroyed: AtomicBool,
    watchers: Mutex<Vec<WatchHandle>>,
    routes: RouteTable,
}

impl ViewModel {
    pub(crate) fn new(
        id: String,
        adapter: Arc<dyn ComponentAdapter>,
        options: ConnectOptions,
        use_state: Arc<AtomicBool>,
        owner: Weak<ConnectorInner>,
    ) -> Self {
        Self {
            id,
            adapter,
            options,
            owner,
            use_state,
            server_update: AtomicBool::new(true),
            requested: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            watchers: Mutex::new(Vec::new()),
            routes: RouteTable::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub fn props(&self) -> Map<String, Value> {
        self.adapter.props()
    }

    pub fn state(&self) -> Map<String, Value> {
        self.adapter.state()
    }

    /// Writes `partial` into the component state.
    pub fn set_state(&self, partial: Map<String, Value>) {
        self.adapter.set_state(partial);
    }

    pub fn exception_handler(&self) -> Option<&ExceptionHandler> {
        self.options.exception_handler.as_ref()
    }

    /// Whether server state goes to the nested state bucket.
    pub fn use_state(&self) -> bool {
        self.use_state.load(Ordering::Acquire)
    }

    pub(crate) fn enable_use_state(&self) {
        self.use_state.store(true, Ordering::Release);
    }

    /// Whether watched property changes are currently dispatched to the server.
    pub fn server_update(&self) -> bool {
        self.server_update.load(Ordering::Acquire)
    }

    /// Disables outbound dispatch until the returned guard is dropped.
    pub fn suspend_server_update(&self) -> ServerUpdateGuard<'_> {
        let previous = self.server_update.swap(false, Ordering::AcqRel);
        ServerUpdateGuard {
            flag: &self.server_update,
            previous,
        }
    }

    /// Whether the initial request has been sent on the current connection.
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn set_requested(&self, requested: bool) {
        self.requested.store(requested, Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Requests the initial state from the hub.
    pub fn request(&self) {
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        if owner.config.debug {
            leptos::logging::log!("[{}] request", self.id);
        }
        owner.hub.send(HubClientMessage::RequestVm(RequestVm {
            vm_id: self.id.clone(),
            vm_arg: self.options.vm_arg.clone(),
        }));
        self.set_requested(true);
    }

    /// Applies server state to the component.
    ///
    /// The first update marks the view model ready: this view model's own
    /// routes are matched against the router's current path, and the router's
    /// table gets the path when none of them match.
    pub fn update(&self, data: Value) {
        match data {
            Value::Object(partial) => self.adapter.set_state(partial),
            other => {
                leptos::logging::warn!("[{}] ignoring non-object state: {}", self.id, other);
                return;
            }
        }

        if !self.ready.swap(true, Ordering::AcqRel) && !self.routes.is_empty() {
            let router = self.owner.upgrade().and_then(|owner| owner.router.clone());
            if let Some(router) = router
                && !self.routes.dispatch(&router.current_path())
            {
                router.ready();
            }
        }
    }

    /// Sends changed properties to the server.
    pub fn dispatch(&self, partial: Map<String, Value>) {
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        if owner.config.debug {
            leptos::logging::log!("[{}] dispatch {:?}", self.id, partial);
        }
        owner.hub.send(HubClientMessage::UpdateVm(UpdateVm {
            vm_id: self.id.clone(),
            data: partial,
        }));
    }

    /// Stops all watchers, disposes the server-side view model and removes
    /// this instance from its connector. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        let watchers = std::mem::take(&mut *lock(&self.watchers));
        for handle in watchers {
            handle.stop();
        }

        if let Some(owner) = self.owner.upgrade() {
            owner.hub.send(HubClientMessage::DisposeVm(DisposeVm { vm_id: self.id.clone() }));
            owner.unregister(self);
        }
    }

    pub(crate) fn add_watch_handle(&self, handle: WatchHandle) {
        if self.is_destroyed() {
            handle.stop();
            return;
        }
        lock(&self.watchers).push(handle);
    }

    /// Registers a route this view model can serve without a page load.
    pub fn map_route(&self, pattern: &str, handler: impl Fn(&RouteParams) + Send + Sync + 'static) {
        self.routes.map(pattern, handler);
    }
}

impl RouteTarget for ViewModel {
    fn route_url(&self, router: &Router) -> bool {
        self.routes.dispatch(&router.url_path())
    }
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("id", &self.id)
            .field("use_state", &self.use_state())
            .field("server_update", &self.server_update())
            .field("requested", &self.requested())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

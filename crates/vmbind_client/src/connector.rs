use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use leptos::logging::{error, log, warn};
use serde_json::{Map, Value};
use vmbind_common::ServerException;

use crate::adapter::HostAdapter;
use crate::config::ConnectorConfig;
use crate::error::BindError;
use crate::events::Subscription;
use crate::host::{ReactiveHost, STATE_BUCKET, WatchPath};
use crate::hub::Hub;
use crate::lock;
use crate::router::Router;
use crate::scheduler::{Scheduler, TimeoutScheduler};
use crate::view_model::{ConnectOptions, ViewModel};

#[derive(Default)]
struct Subscriptions {
    response: Option<Subscription>,
    connected: Option<Subscription>,
    reconnected: Option<Subscription>,
    connection_failed: Option<Subscription>,
}

impl Subscriptions {
    fn take_all(&mut self) -> Vec<Subscription> {
        [
            self.response.take(),
            self.connected.take(),
            self.reconnected.take(),
            self.connection_failed.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub(crate) struct ConnectorInner {
    pub(crate) hub: Arc<dyn Hub>,
    pub(crate) router: Option<Arc<Router>>,
    pub(crate) config: ConnectorConfig,
    scheduler: Arc<dyn Scheduler>,
    view_models: Mutex<HashMap<String, Arc<ViewModel>>>,
    subscriptions: Mutex<Subscriptions>,
}

impl ConnectorInner {
    /// Removes `vm` from the registry, unless the id has since been taken by
    /// another instance.
    pub(crate) fn unregister(&self, vm: &ViewModel) {
        let mut view_models = lock(&self.view_models);
        if view_models
            .get(vm.id())
            .is_some_and(|registered| std::ptr::eq(Arc::as_ptr(registered), vm))
        {
            view_models.remove(vm.id());
        }
    }

    fn snapshot(&self) -> Vec<Arc<ViewModel>> {
        lock(&self.view_models).values().cloned().collect()
    }
}

/// Result of [`Connector::connect`].
#[derive(Clone, Debug)]
pub enum ConnectOutcome {
    /// The view model is bound and registered.
    Ready(Arc<ViewModel>),
    /// A stale instance with the same id was destroyed; the connect is retried
    /// on the next scheduling tick.
    Retrying(PendingConnect),
}

impl ConnectOutcome {
    /// The bound view model, once there is one.
    pub fn view_model(&self) -> Option<Arc<ViewModel>> {
        match self {
            Self::Ready(vm) => Some(vm.clone()),
            Self::Retrying(pending) => pending.view_model(),
        }
    }

    /// Tears the binding down: destroys the view model, or cancels a retry
    /// that has not run yet.
    pub fn release(&self) {
        match self {
            Self::Ready(vm) => vm.destroy(),
            Self::Retrying(pending) => pending.cancel(),
        }
    }
}

#[derive(Default)]
struct PendingState {
    cancelled: AtomicBool,
    resolved: Mutex<Option<ConnectOutcome>>,
}

/// Handle to a connect deferred to the next scheduling tick.
///
/// Cancelling before the tick keeps the retry from registering anything;
/// cancelling after it releases whatever the retry bound.
#[derive(Clone, Default)]
pub struct PendingConnect {
    state: Arc<PendingState>,
}

impl PendingConnect {
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        let resolved = lock(&self.state.resolved).take();
        if let Some(outcome) = resolved {
            outcome.release();
        }
    }

    pub fn view_model(&self) -> Option<Arc<ViewModel>> {
        lock(&self.state.resolved).as_ref().and_then(ConnectOutcome::view_model)
    }

    fn resolve(&self, outcome: ConnectOutcome) {
        *lock(&self.state.resolved) = Some(outcome);
        if self.is_cancelled() {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for PendingConnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingConnect")
            .field("cancelled", &self.is_cancelled())
            .field("resolved", &self.view_model().map(|vm| vm.id().to_string()))
            .finish()
    }
}

/// Binds UI components to server view models.
///
/// Owns the registry of active [`ViewModel`]s and the subscriptions to the
/// hub's connection events. Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// let connector = Connector::builder(hub).build();
///
/// let host = Arc::new(LeptosHost::builder().data("Greeting", Value::Null).build());
/// let outcome = connector.connect("HelloWorld", host, ConnectOptions::new().watch(["Greeting"]))?;
/// ```
#[derive(Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

/// Builder for [`Connector`].
pub struct ConnectorBuilder {
    hub: Arc<dyn Hub>,
    scheduler: Arc<dyn Scheduler>,
    router: Option<Arc<Router>>,
    config: ConnectorConfig,
}

impl ConnectorBuilder {
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Router whose `ready` hook runs when a routed view model receives its first state.
    pub fn router(mut self, router: Arc<Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Connector {
        Connector {
            inner: Arc::new(ConnectorInner {
                hub: self.hub,
                router: self.router,
                config: self.config,
                scheduler: self.scheduler,
                view_models: Mutex::new(HashMap::new()),
                subscriptions: Mutex::new(Subscriptions::default()),
            }),
        }
    }
}

impl Connector {
    pub fn builder(hub: Arc<dyn Hub>) -> ConnectorBuilder {
        ConnectorBuilder {
            hub,
            scheduler: Arc::new(TimeoutScheduler::new()),
            router: None,
            config: ConnectorConfig::default(),
        }
    }

    pub fn hub(&self) -> &Arc<dyn Hub> {
        &self.inner.hub
    }

    pub fn router(&self) -> Option<&Arc<Router>> {
        self.inner.router.as_ref()
    }

    /// Subscribes to the hub events (once each) and starts the connection.
    ///
    /// Safe to call repeatedly; every call primes and starts the hub again.
    pub fn init(&self) {
        let events = self.inner.hub.events();
        {
            let mut subs = lock(&self.inner.subscriptions);

            if subs.response.is_none() {
                let weak = Arc::downgrade(&self.inner);
                subs.response = Some(events.response.subscribe(move |(vm_id, data)| {
                    weak.upgrade()
                        .map(|inner| Connector { inner }.response_vm(vm_id, data.clone()))
                        .unwrap_or(false)
                }));
            }

            if subs.connected.is_none() {
                let weak = Arc::downgrade(&self.inner);
                subs.connected = Some(events.connected.subscribe(move |_| {
                    let Some(inner) = weak.upgrade() else {
                        return false;
                    };
                    for vm in inner.snapshot() {
                        if !vm.requested() {
                            vm.request();
                        }
                    }
                    true
                }));
            }

            if subs.reconnected.is_none() {
                let weak = Arc::downgrade(&self.inner);
                subs.reconnected = Some(events.reconnected.subscribe(move |_| {
                    let Some(inner) = weak.upgrade() else {
                        return false;
                    };
                    Connector { inner }.start();
                    true
                }));
            }

            if subs.connection_failed.is_none() {
                let weak = Arc::downgrade(&self.inner);
                subs.connection_failed = Some(events.connection_failed.subscribe(move |_| {
                    let Some(inner) = weak.upgrade() else {
                        return false;
                    };
                    warn!("Connection to the view-model hub failed.");
                    for vm in inner.snapshot() {
                        vm.set_requested(false);
                    }
                    true
                }));
            }
        }

        self.inner.hub.init_hub();
        self.start();
    }

    /// Starts or resumes the hub. When the hub is not started yet, every
    /// registered view model must request its state again.
    fn start(&self) {
        if !self.inner.hub.is_hub_started() {
            for vm in self.inner.snapshot() {
                vm.set_requested(false);
            }
        }
        self.inner.hub.start_hub();
    }

    /// Connects a component to the server view model `vm_id`.
    ///
    /// If `vm_id` is already active, the stale instance is destroyed and the
    /// connect is retried on the next scheduling tick ([`ConnectOutcome::Retrying`]).
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MissingArguments`] when `vm_id` is empty.
    pub fn connect(
        &self,
        vm_id: impl Into<String>,
        host: Arc<dyn ReactiveHost>,
        options: ConnectOptions,
    ) -> Result<ConnectOutcome, BindError> {
        let vm_id = vm_id.into();
        if vm_id.is_empty() {
            return Err(BindError::MissingArguments);
        }

        let stale = lock(&self.inner.view_models).get(&vm_id).cloned();
        if let Some(stale) = stale {
            error!(
                "Component is attempting to connect to an already active '{}'. \
                 If it's from a dismounted component, you must call destroy() on cleanup.",
                vm_id
            );
            stale.destroy();

            let pending = PendingConnect::default();
            let retry = pending.clone();
            let connector = self.clone();
            self.inner.scheduler.defer(Box::new(move || {
                if retry.is_cancelled() {
                    return;
                }
                match connector.connect(vm_id, host, options) {
                    Ok(outcome) => retry.resolve(outcome),
                    Err(e) => error!("Deferred connect failed: {}", e),
                }
            }));
            return Ok(ConnectOutcome::Retrying(pending));
        }

        let use_state = Arc::new(AtomicBool::new(false));
        let adapter = Arc::new(HostAdapter::new(vm_id.clone(), host.clone(), use_state.clone()));
        let vm = Arc::new(ViewModel::new(
            vm_id.clone(),
            adapter,
            options.clone(),
            use_state,
            Arc::downgrade(&self.inner),
        ));
        lock(&self.inner.view_models).insert(vm_id.clone(), vm.clone());

        if options.use_state {
            if host.has_state_bucket() {
                vm.enable_use_state();
            } else {
                error!(
                    "[{}] Option 'use_state' requires the '{}' data property on the component.",
                    vm_id, STATE_BUCKET
                );
            }
        }

        if !options.watch.is_empty() {
            Self::add_watchers(&options.watch, &vm, host.as_ref());
        }

        if self.inner.config.debug {
            log!("[{}] connected", vm_id);
        }

        self.init();
        Ok(ConnectOutcome::Ready(vm))
    }

    /// Describes a component whose creation connects it to `vm_id` (always
    /// with nested state) and whose destruction tears the binding down.
    pub fn component(&self, name: impl Into<String>, vm_id: impl Into<String>, options: ConnectOptions) -> ComponentDescriptor {
        ComponentDescriptor {
            connector: self.clone(),
            name: name.into(),
            vm_id: vm_id.into(),
            options: options.use_state(true),
        }
    }

    /// Runs deferred connects on schedulers driven by the host (native hosting).
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        self.inner.scheduler.run_pending()
    }

    /// All active view models.
    pub fn view_models(&self) -> Vec<Arc<ViewModel>> {
        self.inner.snapshot()
    }

    pub fn view_model(&self, vm_id: &str) -> Option<Arc<ViewModel>> {
        lock(&self.inner.view_models).get(vm_id).cloned()
    }

    /// Installs one watcher per property; a change is dispatched to the server
    /// only while the view model's server-update flag is set.
    pub(crate) fn add_watchers(watch: &[String], vm: &Arc<ViewModel>, host: &dyn ReactiveHost) {
        let nested = vm.use_state();
        for property in watch {
            let weak = Arc::downgrade(vm);
            let name = property.clone();
            let handle = host.watch(
                WatchPath::new(property, nested),
                Box::new(move |value| {
                    if let Some(vm) = weak.upgrade()
                        && vm.server_update()
                    {
                        let mut partial = Map::new();
                        partial.insert(name.clone(), value.clone());
                        vm.dispatch(partial);
                    }
                }),
            );
            vm.add_watch_handle(handle);
        }
    }

    /// Applies state pushed by the server for `vm_id`.
    ///
    /// Returns `false` when no view model with that id is active. Watched
    /// properties changed by the apply are not dispatched back to the server.
    pub fn response_vm(&self, vm_id: &str, data: Value) -> bool {
        let Some(vm) = self.view_model(vm_id) else {
            return false;
        };

        if let Some(exception) = ServerException::from_payload(&data) {
            match vm.exception_handler() {
                Some(handler) => handler(&exception),
                None => {
                    error!("[{}] {}", vm_id, exception);
                    return true;
                }
            }
        }

        let _guard = vm.suspend_server_update();
        vm.update(data);
        true
    }

    /// Destroys every view model and drops the hub subscriptions.
    /// A later [`init`](Self::init) subscribes again.
    pub fn shutdown(&self) {
        for vm in self.inner.snapshot() {
            vm.destroy();
        }

        let subs = lock(&self.inner.subscriptions).take_all();
        for sub in subs {
            sub.unsubscribe();
        }
    }
}

/// Declarative component definition produced by [`Connector::component`].
#[derive(Clone)]
pub struct ComponentDescriptor {
    connector: Connector,
    name: String,
    vm_id: String,
    options: ConnectOptions,
}

impl ComponentDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vm_id(&self) -> &str {
        &self.vm_id
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Initial local data: an empty nested state bucket.
    pub fn data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(STATE_BUCKET.to_string(), Value::Object(Map::new()));
        data
    }

    /// Creation hook.
    pub fn created(&self, host: Arc<dyn ReactiveHost>) -> Result<ConnectOutcome, BindError> {
        self.connector.connect(self.vm_id.clone(), host, self.options.clone())
    }

    /// Destruction hook.
    pub fn destroyed(&self, outcome: &ConnectOutcome) {
        outcome.release();
    }
}

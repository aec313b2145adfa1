//! # vmbind client
//!
//! Client-side view-model binding layer with Leptos integration.
//!
//! Components bind to server-side view models through a [`Connector`]: the
//! server pushes state over the hub, the connector applies it to the bound
//! component, and watched local changes are dispatched back. A [`Router`]
//! maps URL templates to handlers and lets routed view models serve a URL
//! without a page load.
//!
//! ## Features
//!
//! - **Registry**: at most one active binding per view-model id
//! - **Feedback suppression**: server writes never echo back to the server
//! - **Nested state**: server state can live in a `state` bucket of the component
//! - **Reconnection**: bindings request their state again after reconnecting
//! - **Routing**: `:param` templates, optional groups, history integration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leptos::prelude::*;
//! use serde_json::Value;
//! use vmbind_client::{ConnectOptions, HubConfig, HubProvider, LeptosHost, use_view_model};
//!
//! #[component]
//! fn App() -> impl IntoView {
//!     view! {
//!         <HubProvider config=HubConfig::new("ws://localhost:5000/dotnetify").auto_connect(true)>
//!             <HelloWorld/>
//!         </HubProvider>
//!     }
//! }
//!
//! #[component]
//! fn HelloWorld() -> impl IntoView {
//!     let host = LeptosHost::builder()
//!         .data("FirstName", Value::Null)
//!         .data("FullName", Value::Null)
//!         .build();
//!     let _vm = use_view_model("HelloWorld", host.clone(), ConnectOptions::new().watch(["FirstName"]));
//!
//!     view! {
//!         <input
//!             prop:value=move || host.get("FirstName").as_str().unwrap_or_default().to_string()
//!             on:change={
//!                 let host = host.clone();
//!                 move |ev| host.set("FirstName", Value::String(event_target_value(&ev)))
//!             }
//!         />
//!         <p>{move || host.get("FullName").as_str().unwrap_or_default().to_string()}</p>
//!     }
//! }
//! ```

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Module declarations
mod adapter;
mod config;
mod connector;
mod error;
mod events;
mod hooks;
mod host;
mod hub;
mod leptos_host;
mod location;
mod provider;
mod route_table;
mod router;
mod scheduler;
mod view_model;

// Re-exports
pub use adapter::{ComponentAdapter, HostAdapter};
pub use config::{ConnectorConfig, HubConfig};
pub use connector::{ComponentDescriptor, ConnectOutcome, Connector, ConnectorBuilder, PendingConnect};
pub use error::BindError;
pub use events::{EventEmitter, Subscription};
pub use hooks::{provide_connector, use_connector, use_view_model};
pub use host::{ReactiveHost, STATE_BUCKET, WatchCallback, WatchHandle, WatchPath};
pub use hub::{Hub, HubEvents};
pub use leptos_host::{LeptosHost, LeptosHostBuilder};
pub use location::{BrowserLocation, History, Navigator};
pub use provider::{HubProvider, WebSocketHub};
pub use route_table::{RouteMatch, RouteParams, RouteTable};
pub use router::{RouteAdapter, RouteTarget, Router, RouterState};
pub use scheduler::{QueuedScheduler, Scheduler, Task, TimeoutScheduler};
pub use view_model::{ConnectOptions, ExceptionHandler, ServerUpdateGuard, ViewModel};

pub use vmbind_common::{HubClientMessage, HubError, HubServerMessage, ServerException};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

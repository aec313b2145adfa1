use std::sync::Arc;

use leptos::prelude::*;

use crate::connector::{ConnectOutcome, Connector};
use crate::error::BindError;
use crate::host::ReactiveHost;
use crate::view_model::ConnectOptions;

/// Makes `connector` available to descendant components.
///
/// [`HubProvider`](crate::HubProvider) calls this for you.
pub fn provide_connector(connector: Connector) {
    provide_context(connector);
}

/// Hook returning the connector of the enclosing provider.
///
/// # Panics
///
/// Panics if called outside of a `HubProvider` (or a `provide_connector` scope).
pub fn use_connector() -> Connector {
    expect_context::<Connector>()
}

/// Hook to bind the current component to the server view model `vm_id`.
///
/// The binding is created immediately and torn down when the component is
/// unmounted, so a remount with the same id never finds a stale instance.
///
/// # Panics
///
/// Panics if called outside of a `HubProvider` context.
///
/// # Example
///
/// ```rust,ignore
/// use vmbind_client::{use_view_model, ConnectOptions, LeptosHost};
///
/// #[component]
/// fn HelloWorld() -> impl IntoView {
///     let host = LeptosHost::builder()
///         .data("Greetings", Value::Null)
///         .data("ServerTime", Value::Null)
///         .build();
///     let _vm = use_view_model("HelloWorld", host.clone(), ConnectOptions::new());
///
///     view! {
///         <p>{move || host.get("Greetings").as_str().unwrap_or_default().to_string()}</p>
///     }
/// }
/// ```
pub fn use_view_model<H>(vm_id: &str, host: H, options: ConnectOptions) -> Result<ConnectOutcome, BindError>
where
    H: ReactiveHost + 'static,
{
    let connector = use_connector();
    let host: Arc<dyn ReactiveHost> = Arc::new(host);
    let outcome = connector.connect(vm_id, host, options)?;

    let cleanup = outcome.clone();
    on_cleanup(move || cleanup.release());

    Ok(outcome)
}

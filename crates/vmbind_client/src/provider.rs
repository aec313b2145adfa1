use std::sync::{Arc, Mutex};

use codee::Decoder;
use leptos::prelude::*;
use leptos_use::{DummyEncoder, ReconnectLimit, UseWebSocketOptions, UseWebSocketReturn, use_websocket_with_options};
use vmbind_common::codec::HubJsonCodec;
use vmbind_common::{HubClientMessage, HubServerMessage};

use crate::config::{ConnectorConfig, HubConfig};
use crate::connector::Connector;
use crate::error::BindError;
use crate::hooks::provide_connector;
use crate::hub::{Hub, HubEvents};
use crate::lock;
use crate::router::Router;

type SendFn = Arc<dyn Fn(&HubClientMessage) + Send + Sync>;
type ControlFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SocketState {
    open: bool,
    connecting: bool,
    started: bool,
    has_connected: bool,
    pending: Vec<HubClientMessage>,
    send: Option<SendFn>,
    open_fn: Option<ControlFn>,
}

/// [`Hub`] over a websocket.
///
/// Messages sent before the socket opens are queued and flushed on open.
/// The first open emits `connected`, later opens emit `reconnected`; a socket
/// error emits `connection_failed`.
#[derive(Default)]
pub struct WebSocketHub {
    events: HubEvents,
    state: Mutex<SocketState>,
}

impl WebSocketHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires the transport functions of the underlying socket.
    pub fn attach(&self, send: SendFn, open: ControlFn) {
        let mut state = lock(&self.state);
        state.send = Some(send);
        state.open_fn = Some(open);
    }

    /// The socket was opened by its owner; `start_hub` must not open it again.
    pub fn mark_connecting(&self) {
        let mut state = lock(&self.state);
        if !state.open {
            state.connecting = true;
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Socket opened: flushes queued messages, then emits `connected` or
    /// `reconnected`.
    pub fn handle_open(&self) {
        let (send, pending, reconnect) = {
            let mut state = lock(&self.state);
            state.open = true;
            state.connecting = false;
            let reconnect = state.has_connected;
            state.has_connected = true;
            if !reconnect {
                state.started = true;
            }
            (state.send.clone(), std::mem::take(&mut state.pending), reconnect)
        };

        if let Some(send) = send {
            for message in &pending {
                send(message);
            }
        }

        if reconnect {
            self.events.reconnected.emit(&());
        } else {
            self.events.connected.emit(&());
        }
    }

    /// Socket closed: the hub must be started again.
    pub fn handle_close(&self) {
        let mut state = lock(&self.state);
        state.open = false;
        state.connecting = false;
        state.started = false;
    }

    pub fn handle_error(&self) {
        {
            let mut state = lock(&self.state);
            state.connecting = false;
            state.started = state.open;
        }
        self.events.connection_failed.emit(&());
    }

    /// Publishes a decoded server message.
    pub fn handle_message(&self, message: HubServerMessage) {
        match message {
            HubServerMessage::ResponseVm(response) => {
                self.events.response.emit(&(response.vm_id, response.data));
            }
        }
    }
}

impl Hub for WebSocketHub {
    fn init_hub(&self) {}

    fn start_hub(&self) {
        let open_fn = {
            let mut state = lock(&self.state);
            if state.open {
                state.started = true;
                None
            } else if state.connecting {
                return;
            } else {
                state.connecting = true;
                state.open_fn.clone()
            }
        };

        match open_fn {
            Some(open) => open(),
            None => {
                if self.is_open() {
                    self.events.connected.emit(&());
                }
            }
        }
    }

    fn is_hub_started(&self) -> bool {
        let state = lock(&self.state);
        state.started || state.connecting
    }

    fn send(&self, message: HubClientMessage) {
        let send = {
            let mut state = lock(&self.state);
            match (&state.send, state.open) {
                (Some(send), true) => send.clone(),
                _ => {
                    state.pending.push(message);
                    return;
                }
            }
        };
        send(&message);
    }

    fn events(&self) -> &HubEvents {
        &self.events
    }
}

/// Provider component that opens the view-model hub websocket and provides a
/// [`Connector`] to its children.
///
/// # Example
///
/// ```rust,ignore
/// use vmbind_client::{HubConfig, HubProvider};
///
/// #[component]
/// pub fn App() -> impl IntoView {
///     view! {
///         <HubProvider config=HubConfig::new("ws://localhost:5000/dotnetify")>
///             <HelloWorld />
///         </HubProvider>
///     }
/// }
/// ```
#[component]
pub fn HubProvider(
    /// Websocket endpoint and reconnection policy
    config: HubConfig,
    /// Connector options (default: no debug tracing)
    #[prop(optional)]
    connector_config: Option<ConnectorConfig>,
    /// Router notified when routed view models become ready
    #[prop(optional)]
    router: Option<Arc<Router>>,
    /// Child components
    children: Children,
) -> impl IntoView {
    let last_error = RwSignal::new(None::<BindError>);
    let hub = Arc::new(WebSocketHub::new());

    let mut builder = Connector::builder(hub.clone()).config(connector_config.unwrap_or_default());
    if let Some(router) = router {
        builder = builder.router(router);
    }
    let connector = builder.build();
    provide_connector(connector.clone());
    provide_context(last_error);

    let reconnect_limit = match config.reconnect_limit {
        Some(limit) => ReconnectLimit::Limited(limit),
        None => ReconnectLimit::Infinite,
    };

    let (on_open_hub, on_close_hub, on_error_hub, on_message_hub) =
        (hub.clone(), hub.clone(), hub.clone(), hub.clone());

    let UseWebSocketReturn { send, open, .. } =
        use_websocket_with_options::<HubClientMessage, HubServerMessage, HubJsonCodec, (), DummyEncoder>(
            &config.url,
            UseWebSocketOptions::default()
                .immediate(config.auto_connect)
                .reconnect_limit(reconnect_limit)
                .reconnect_interval(config.reconnect_interval_ms)
                .on_open(move |_| on_open_hub.handle_open())
                .on_close(move |_| on_close_hub.handle_close())
                .on_error(move |e| {
                    leptos::logging::warn!("[HubProvider] websocket error: {:?}", e);
                    on_error_hub.handle_error();
                })
                .on_message_raw(move |text: &str| {
                    match <HubJsonCodec as Decoder<HubServerMessage>>::decode(text) {
                        Ok(message) => on_message_hub.handle_message(message),
                        Err(e) => {
                            let e = BindError::from(e);
                            leptos::logging::warn!("[HubProvider] {}", e);
                            last_error.try_update_untracked(|err| *err = Some(e));
                            last_error.notify();
                        }
                    }
                }),
        );

    hub.attach(
        Arc::new(move |message: &HubClientMessage| send(message)),
        Arc::new(move || open()),
    );

    if config.auto_connect {
        hub.mark_connecting();
    }

    connector.init();

    on_cleanup(move || connector.shutdown());

    children()
}

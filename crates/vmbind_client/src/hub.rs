use serde_json::Value;
use vmbind_common::HubClientMessage;

use crate::events::EventEmitter;

/// Connection events published by a [`Hub`].
#[derive(Clone, Default)]
pub struct HubEvents {
    /// `(vm_id, data)` pushed by the server.
    pub response: EventEmitter<(String, Value)>,
    /// The connection is open (first open, or `start_hub` on an open hub).
    pub connected: EventEmitter<()>,
    /// The connection came back after a drop.
    pub reconnected: EventEmitter<()>,
    /// The connection could not be established or was lost.
    pub connection_failed: EventEmitter<()>,
}

impl HubEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transport to the view-model hub.
///
/// Implementations own the physical connection. The connector only needs to
/// prime it, start it, ask whether it is started, send messages and listen to
/// [`HubEvents`].
///
/// `start_hub` on a hub that is already connected must emit
/// [`HubEvents::connected`] again, so that view models connected after the
/// first open still get requested.
pub trait Hub: Send + Sync {
    /// Prepares the transport. Called on every `Connector::init`; must be idempotent.
    fn init_hub(&self);

    /// Starts or resumes the connection.
    fn start_hub(&self);

    /// Whether the connection is open or currently opening.
    fn is_hub_started(&self) -> bool;

    /// Sends a message to the hub.
    fn send(&self, message: HubClientMessage);

    fn events(&self) -> &HubEvents;
}

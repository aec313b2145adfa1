use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client -> hub messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HubClientMessage {
    /// Ask the hub to instantiate a view model and send its initial state.
    RequestVm(RequestVm),
    /// Push changed properties of a view model to the hub.
    UpdateVm(UpdateVm),
    /// Release the server-side view model.
    DisposeVm(DisposeVm),
}

/// Hub -> client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HubServerMessage {
    /// State (full or partial) for one view model.
    ResponseVm(ResponseVm),
}

/// Request the initial state of a view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestVm {
    pub vm_id: String,
    /// Optional argument passed to the server-side view model constructor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_arg: Option<Value>,
}

/// Changed properties, keyed by property name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateVm {
    pub vm_id: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposeVm {
    pub vm_id: String,
}

/// State pushed by the hub for `vm_id`.
///
/// `data` is normally a JSON object of property values, but may instead carry
/// a server-side exception marker (see [`ServerException`](crate::ServerException)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseVm {
    pub vm_id: String,
    pub data: Value,
}

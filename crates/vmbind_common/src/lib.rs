pub mod messages;
pub use messages::*;

pub mod codec;

pub mod error;
pub use error::HubError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt::Display;

/// Property name the hub uses to flag a server-side exception payload.
pub const EXCEPTION_TYPE_KEY: &str = "ExceptionType";
/// Property name carrying the exception message.
pub const EXCEPTION_MESSAGE_KEY: &str = "Message";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
/// An exception raised by a server-side view model and embedded in a push
/// payload instead of regular state.
pub struct ServerException {
    /// Exception type name as reported by the server.
    pub name: String,
    pub message: String,
}

impl ServerException {
    /// Extracts the exception marker from a push payload.
    ///
    /// A payload is an exception when it is an object holding both
    /// `ExceptionType` and `Message`.
    pub fn from_payload(data: &Value) -> Option<Self> {
        let object = data.as_object()?;
        let name = object.get(EXCEPTION_TYPE_KEY)?;
        let message = object.get(EXCEPTION_MESSAGE_KEY)?;
        Some(Self {
            name: value_text(name),
            message: value_text(message),
        })
    }
}

impl Display for ServerException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

use thiserror::Error;
use vmbind_common::HubError;

/// Errors that can occur when using the vmbind_client library.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// A required collaborator is missing, e.g. routing without a route adapter.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `connect` was called without a view-model id.
    #[error("missing arguments. Usage: connect(vm_id, component)")]
    MissingArguments,

    /// Hub message could not be encoded or decoded.
    #[error(transparent)]
    Hub(#[from] HubError),
}

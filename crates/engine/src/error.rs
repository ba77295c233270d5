//! Shared error types for the engine crate.

use thiserror::Error;

/// Errors from the action transport.
///
/// `Unauthorized` is deliberately distinct from the generic failures: it
/// means the remote session is no longer authorized and must be routed to
/// the delivery host rather than retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("the remote session is no longer authorized")]
    Unauthorized,

    #[error("action request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed action reply")]
    MalformedReply,

    #[error("could not decode the action reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors from the item interaction surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ItemServiceError {
    #[error("no item service registered for kind {kind}")]
    UnknownKind { kind: String },

    #[error("item service failed: {reason}")]
    Failed { reason: String },
}

/// Errors emitted by the session state machine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("the session is closed")]
    Closed,

    #[error("backward navigation is not available from the current context")]
    BackwardNotAllowed,

    #[error("the server does not offer the {action} action from the current context")]
    ActionUnavailable { action: &'static str },

    #[error("no exit is pending confirmation")]
    NoPendingExit,

    #[error("{action} is not implemented")]
    Unsupported { action: &'static str },

    #[error(transparent)]
    Item(#[from] ItemServiceError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

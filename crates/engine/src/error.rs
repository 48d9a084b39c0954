//! Engine error types.
//!
//! None of these cross the lifecycle operations: they are what the caller's
//! hooks and the transport report back, and the controller turns them into
//! file statuses.

use dropload_protocol::FailureKind;

/// Failure reported by the caller's upload-params hook.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("upload params unavailable: {0}")]
    Unavailable(String),

    #[error("upload params have no URL")]
    MissingUrl,
}

/// Failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be built (bad URL, bad header, ...).
    #[error("invalid request: {0}")]
    Request(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("request aborted")]
    Aborted,
}

impl TransportError {
    /// Diagnostic class of the failure.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Aborted => FailureKind::Aborted,
            TransportError::Request(_) | TransportError::Network(_) => FailureKind::Unknown,
        }
    }
}

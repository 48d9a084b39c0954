//! Wire-visible types shared by the Dropload crates.
//!
//! Everything here is what a server or a UI layer can observe: the status
//! strings of a tracked file, the rejection codes produced at intake, the
//! identification headers attached to every request and the upload
//! parameters a caller resolves per attempt.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{ErrorCode, FileError, StatusMessage};
pub use types::{FailureKind, Method, UploadParams, UploadStatus};

/// Errors produced when parsing protocol strings.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown upload status: {0}")]
    UnknownStatus(String),

    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::UploadStatus;

/// Reason a candidate file was rejected at intake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "file-invalid-type")]
    FileInvalidType,
    #[serde(rename = "file-too-large")]
    FileTooLarge,
    #[serde(rename = "file-too-small")]
    FileTooSmall,
    #[serde(rename = "too-many-files")]
    TooManyFiles,
    /// Code chosen by a caller-supplied validator.
    #[serde(untagged)]
    Custom(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::FileInvalidType => "file-invalid-type",
            ErrorCode::FileTooLarge => "file-too-large",
            ErrorCode::FileTooSmall => "file-too-small",
            ErrorCode::TooManyFiles => "too-many-files",
            ErrorCode::Custom(code) => code,
        }
    }

    /// Status a tracked entry would carry if rejected for this reason.
    pub fn rejection_status(&self) -> UploadStatus {
        match self {
            ErrorCode::FileInvalidType => UploadStatus::RejectedFileType,
            ErrorCode::FileTooLarge | ErrorCode::FileTooSmall => UploadStatus::ErrorFileSize,
            ErrorCode::TooManyFiles => UploadStatus::RejectedMaxFiles,
            ErrorCode::Custom(_) => UploadStatus::ErrorValidation,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rejection reason with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub code: ErrorCode,
    pub message: String,
}

impl FileError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_type(accept: &str) -> Self {
        Self::new(
            ErrorCode::FileInvalidType,
            format!("File type must be {accept}"),
        )
    }

    pub fn too_large(max_size: u64) -> Self {
        Self::new(
            ErrorCode::FileTooLarge,
            format!("File is larger than {max_size} bytes"),
        )
    }

    pub fn too_small(min_size: u64) -> Self {
        Self::new(
            ErrorCode::FileTooSmall,
            format!("File is smaller than {min_size} bytes"),
        )
    }

    pub fn too_many_files() -> Self {
        Self::new(ErrorCode::TooManyFiles, "Too many files")
    }

    /// A validator-defined rejection.
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Custom(code.into()), message)
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for FileError {}

/// Body a server may return on a non-success response to name the status
/// the file should move to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    /// Parses a response body and resolves its message to a known status.
    ///
    /// Returns `None` when the body is not JSON, has no `message`, or names
    /// a status this engine does not know.
    pub fn parse_status(body: &[u8]) -> Option<UploadStatus> {
        let msg: StatusMessage = serde_json::from_slice(body).ok()?;
        msg.message.parse().ok()
    }
}

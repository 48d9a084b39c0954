use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dropload_protocol::{FailureKind, FileError, UploadStatus};
use dropload_transfer::{ChunkProgress, FileInfo, Rejection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a tracked file. Fresh per accepted file, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file offered to the engine, before validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub info: FileInfo,
    pub last_modified: Option<DateTime<Utc>>,
    pub content: Bytes,
}

impl CandidateFile {
    /// Builds a candidate whose size is the length of `content`.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            info: FileInfo::new(name, content.len() as u64, mime_type),
            last_modified: None,
            content,
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn name(&self) -> &str {
        self.info.name.as_deref().unwrap_or_default()
    }
}

impl AsRef<FileInfo> for CandidateFile {
    fn as_ref(&self) -> &FileInfo {
        &self.info
    }
}

/// Display attributes produced by the caller's preview hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Media duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
}

/// Observable metadata of a tracked file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    /// Start of the current attempt. Refreshed on every upload.
    pub upload_start: DateTime<Utc>,
    pub status: UploadStatus,
    /// Percent complete, `0..=100`.
    pub progress: f64,
    /// Estimated whole seconds remaining.
    pub estimated: u64,
    /// One slot per chunk in chunked mode, empty otherwise.
    pub chunk_progress: Vec<ChunkProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    /// Diagnostic class of the last transport failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// An accepted file: immutable content plus evolving metadata.
#[derive(Debug, Clone)]
pub struct TrackedFile {
    pub meta: FileMeta,
    pub content: Bytes,
    pub(crate) attempt: u64,
}

impl TrackedFile {
    /// Tracks an accepted candidate under a fresh id, in `Preparing`.
    pub fn from_candidate(candidate: CandidateFile, preview: Option<Preview>, now: DateTime<Utc>) -> Self {
        let meta = FileMeta {
            id: FileId::new(),
            name: candidate.name().to_string(),
            size: candidate.content.len() as u64,
            mime_type: candidate.info.mime_type.clone(),
            last_modified_date: candidate.last_modified,
            upload_start: now,
            status: UploadStatus::Preparing,
            progress: 0.0,
            estimated: 0,
            chunk_progress: Vec::new(),
            preview,
            failure: None,
        };
        Self {
            meta,
            content: candidate.content,
            attempt: 0,
        }
    }

    pub fn id(&self) -> FileId {
        self.meta.id
    }

    pub fn status(&self) -> UploadStatus {
        self.meta.status
    }
}

/// A candidate rejected by the latest intake batch.
#[derive(Debug, Clone)]
pub struct RejectedEntry {
    pub file: CandidateFile,
    pub errors: Vec<FileError>,
    /// Rejection status derived from the first error.
    pub status: UploadStatus,
}

impl From<Rejection<CandidateFile>> for RejectedEntry {
    fn from(rejection: Rejection<CandidateFile>) -> Self {
        let status = rejection
            .errors
            .first()
            .map(|e| e.code.rejection_status())
            .unwrap_or(UploadStatus::ErrorValidation);
        Self {
            file: rejection.file,
            errors: rejection.errors,
            status,
        }
    }
}

/// Drag feedback for the currently hovered item set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    pub active: bool,
    pub accept: bool,
    pub reject: bool,
}

/// Notification emitted on every observable state change.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Added {
        id: FileId,
        name: String,
    },
    StatusChanged {
        id: FileId,
        status: UploadStatus,
    },
    Progress {
        id: FileId,
        progress: f64,
        estimated: u64,
    },
    Removed {
        id: FileId,
    },
    /// The rejected list was replaced by an intake batch.
    Rejected {
        count: usize,
    },
}

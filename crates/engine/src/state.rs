//! Tracked-file state and its reducer.
//!
//! All mutation goes through [`EngineState::apply`], which the controller
//! calls under its lock. Each applied action yields the events observers
//! see. Updates coming from transfer tasks carry the attempt they belong to
//! and are dropped once the file moved on.

use chrono::{DateTime, Utc};
use dropload_protocol::{FailureKind, UploadStatus};
use dropload_transfer::{
    ChunkProgress, FileInfo, aggregate_chunk_progress, all_chunks_done,
    estimated_seconds_remaining,
};
use tracing::debug;

use crate::registry::TransportRegistry;
use crate::types::{FileId, RejectedEntry, TrackedFile, UploadEvent};

#[derive(Debug)]
pub(crate) enum Action {
    Add(TrackedFile),
    Remove(FileId),
    SetStatus {
        id: FileId,
        status: UploadStatus,
    },
    /// User cancel: only an uploading file moves to `aborted`.
    Cancel(FileId),
    /// Opens a new attempt: progress and chunk slots reset, status back to
    /// `getting_upload_params`.
    BeginAttempt {
        id: FileId,
        chunks: usize,
        now: DateTime<Utc>,
    },
    /// Update produced by a specific attempt.
    Attempt {
        id: FileId,
        attempt: u64,
        update: AttemptUpdate,
    },
}

#[derive(Debug)]
pub(crate) enum AttemptUpdate {
    Status(UploadStatus),
    Progress {
        chunk: Option<usize>,
        percent: f64,
        now: DateTime<Utc>,
    },
    Loaded {
        chunk: Option<usize>,
    },
    Failed {
        status: UploadStatus,
        failure: Option<FailureKind>,
    },
}

#[derive(Debug)]
pub(crate) struct EngineState {
    pub files: Vec<TrackedFile>,
    pub rejected: Vec<RejectedEntry>,
    pub registry: TransportRegistry,
    pub hovered: Vec<FileInfo>,
    /// Cleared on shutdown; nothing is applied afterwards.
    pub running: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            rejected: Vec::new(),
            registry: TransportRegistry::default(),
            hovered: Vec::new(),
            running: true,
        }
    }
}

impl EngineState {
    pub fn file(&self, id: FileId) -> Option<&TrackedFile> {
        self.files.iter().find(|f| f.meta.id == id)
    }

    fn file_mut(&mut self, id: FileId) -> Option<&mut TrackedFile> {
        self.files.iter_mut().find(|f| f.meta.id == id)
    }

    /// Applies `action` and returns the resulting events.
    pub fn apply(&mut self, action: Action) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        if !self.running {
            debug!(?action, "engine stopped, update dropped");
            return events;
        }

        match action {
            Action::Add(file) => {
                events.push(UploadEvent::Added {
                    id: file.meta.id,
                    name: file.meta.name.clone(),
                });
                self.files.push(file);
            }
            Action::Remove(id) => {
                let before = self.files.len();
                self.files.retain(|f| f.meta.id != id);
                if self.files.len() != before {
                    events.push(UploadEvent::Removed { id });
                }
            }
            Action::SetStatus { id, status } => {
                if let Some(file) = self.file_mut(id) {
                    set_status(file, status, &mut events);
                }
            }
            Action::Cancel(id) => {
                if let Some(file) = self.file_mut(id)
                    && file.meta.status == UploadStatus::Uploading
                {
                    file.meta.failure = Some(FailureKind::Aborted);
                    set_status(file, UploadStatus::Aborted, &mut events);
                }
            }
            Action::BeginAttempt { id, chunks, now } => {
                if let Some(file) = self.file_mut(id) {
                    file.attempt += 1;
                    file.meta.upload_start = now;
                    file.meta.failure = None;
                    file.meta.chunk_progress = vec![ChunkProgress::default(); chunks];
                    set_progress(file, 0.0, 0, &mut events);
                    set_status(file, UploadStatus::GettingUploadParams, &mut events);
                }
            }
            Action::Attempt {
                id,
                attempt,
                update,
            } => match self.file_mut(id) {
                Some(file) if file.attempt == attempt => {
                    apply_attempt(file, update, &mut events);
                }
                _ => debug!(file = %id, attempt, ?update, "stale transfer update dropped"),
            },
        }
        events
    }
}

fn apply_attempt(file: &mut TrackedFile, update: AttemptUpdate, events: &mut Vec<UploadEvent>) {
    let status = file.meta.status;
    match update {
        AttemptUpdate::Status(next) => {
            if !status.is_finished() {
                set_status(file, next, events);
            }
        }
        AttemptUpdate::Progress {
            chunk,
            percent,
            now,
        } => {
            if status != UploadStatus::Uploading {
                return;
            }
            let progress = match chunk {
                None => percent,
                Some(index) => {
                    match file.meta.chunk_progress.get_mut(index) {
                        Some(slot) if !slot.is_done() => *slot = ChunkProgress::Percent(percent),
                        _ => return,
                    }
                    aggregate_chunk_progress(&file.meta.chunk_progress)
                }
            };
            let estimated = estimated_seconds_remaining(file.meta.upload_start, now, progress);
            set_progress(file, progress, estimated, events);
        }
        AttemptUpdate::Loaded { chunk } => {
            if status != UploadStatus::Uploading {
                return;
            }
            match chunk {
                None => {
                    set_progress(file, 100.0, 0, events);
                    set_status(file, UploadStatus::Done, events);
                }
                Some(index) => {
                    let Some(slot) = file.meta.chunk_progress.get_mut(index) else {
                        return;
                    };
                    *slot = ChunkProgress::Done;
                    let progress = aggregate_chunk_progress(&file.meta.chunk_progress);
                    if all_chunks_done(&file.meta.chunk_progress) {
                        set_progress(file, progress, 0, events);
                        set_status(file, UploadStatus::Done, events);
                    } else {
                        let estimated = file.meta.estimated;
                        set_progress(file, progress, estimated, events);
                    }
                }
            }
        }
        AttemptUpdate::Failed {
            status: next,
            failure,
        } => {
            if !status.is_finished() {
                file.meta.failure = failure;
                set_status(file, next, events);
            }
        }
    }
}

fn set_status(file: &mut TrackedFile, status: UploadStatus, events: &mut Vec<UploadEvent>) {
    if file.meta.status != status {
        file.meta.status = status;
        events.push(UploadEvent::StatusChanged {
            id: file.meta.id,
            status,
        });
    }
}

fn set_progress(file: &mut TrackedFile, progress: f64, estimated: u64, events: &mut Vec<UploadEvent>) {
    file.meta.progress = progress;
    file.meta.estimated = estimated;
    events.push(UploadEvent::Progress {
        id: file.meta.id,
        progress,
        estimated,
    });
}

//! Intake: validating offered files and drag feedback.

use std::sync::Arc;

use chrono::Utc;
use dropload_protocol::UploadStatus;
use dropload_transfer::{FileInfo, all_files_accepted, partition_batch};
use tracing::{debug, info};

use crate::controller::UploadEngine;
use crate::state::Action;
use crate::types::{CandidateFile, DragState, FileId, RejectedEntry, TrackedFile, UploadEvent};

/// What happened to one intake batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    pub accepted: Vec<FileId>,
    pub rejected: usize,
}

impl UploadEngine {
    /// Validates a batch, tracks the accepted files and replaces the
    /// rejected list. Accepted files start uploading when `auto_upload` is
    /// set.
    ///
    /// Batches are taken in one at a time; a batch offered while another is
    /// being validated waits for it.
    pub fn add_files(&self, batch: Vec<CandidateFile>) -> IntakeReport {
        let inner = Arc::clone(&self.inner);
        if inner.config.disabled {
            debug!(count = batch.len(), "intake disabled, batch ignored");
            return IntakeReport::default();
        }

        let serial = inner.lock_intake();
        let existing = {
            let mut state = inner.lock();
            if !state.running {
                return IntakeReport::default();
            }
            state.hovered.clear();
            state.files.len()
        };

        let outcome = partition_batch(batch, &inner.config.constraints(), existing, |file| {
            inner.hooks.validate(file)
        });

        let rejected: Vec<RejectedEntry> =
            outcome.rejected.into_iter().map(RejectedEntry::from).collect();
        for entry in &rejected {
            info!(
                name = entry.file.name(),
                status = %entry.status,
                errors = entry.errors.len(),
                "file rejected"
            );
        }

        let now = Utc::now();
        let files: Vec<TrackedFile> = outcome
            .accepted
            .into_iter()
            .map(|candidate| {
                let preview = inner.hooks.preview(&candidate);
                TrackedFile::from_candidate(candidate, preview, now)
            })
            .collect();

        let next = if inner.config.auto_upload {
            UploadStatus::GettingUploadParams
        } else {
            UploadStatus::Ready
        };

        let report = {
            let mut state = inner.lock();
            let rejected_count = rejected.len();
            state.rejected = rejected;
            inner.emit(UploadEvent::Rejected {
                count: rejected_count,
            });

            let mut accepted = Vec::with_capacity(files.len());
            for file in files {
                let id = file.id();
                inner.dispatch_locked(&mut state, Action::Add(file));
                inner.dispatch_locked(&mut state, Action::SetStatus { id, status: next });
                accepted.push(id);
            }
            IntakeReport {
                accepted,
                rejected: rejected_count,
            }
        };
        drop(serial);
        info!(
            accepted = report.accepted.len(),
            rejected = report.rejected,
            "intake batch processed"
        );

        if inner.config.auto_upload {
            for id in &report.accepted {
                inner.upload(*id);
            }
        }
        report
    }

    /// Items are hovering over the drop surface.
    pub fn drag_enter(&self, items: Vec<FileInfo>) {
        if self.inner.config.disabled {
            return;
        }
        self.inner.lock().hovered = items;
    }

    pub fn drag_leave(&self) {
        self.inner.lock().hovered.clear();
    }

    /// Feedback for the hovered set: whether it would be accepted as a whole.
    pub fn drag_state(&self) -> DragState {
        let state = self.inner.lock();
        if state.hovered.is_empty() {
            return DragState::default();
        }
        let accept = all_files_accepted(&state.hovered, &self.inner.config.constraints());
        DragState {
            active: true,
            accept,
            reject: !accept,
        }
    }
}

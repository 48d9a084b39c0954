//! Lifecycle controller.
//!
//! `UploadEngine` owns the tracked files and exposes the per-file
//! operations (upload, cancel, restart, remove) and the bulk `upload_all`.
//! Transfers run as Tokio tasks; they report back through the same reducer
//! the operations use, so observers see one ordered event stream.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use dropload_protocol::UploadStatus;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::hooks::UploadHooks;
use crate::state::{Action, AttemptUpdate, EngineState};
use crate::strategy::{plan_transfer, transfer_mode};
use crate::transport::Transport;
use crate::types::{FileId, RejectedEntry, TrackedFile, UploadEvent};

/// Shared core of an engine, also held by its transfer tasks.
pub(crate) struct Inner {
    pub config: EngineConfig,
    pub hooks: Arc<dyn UploadHooks>,
    pub transport: Arc<dyn Transport>,
    state: Mutex<EngineState>,
    /// Held for a whole intake batch so count checks see every earlier batch.
    intake: Mutex<()>,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
}

impl Inner {
    pub fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock_intake(&self) -> MutexGuard<'_, ()> {
        self.intake.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `action` and publishes its events.
    pub fn dispatch(&self, action: Action) -> Vec<UploadEvent> {
        let mut state = self.lock();
        self.dispatch_locked(&mut state, action)
    }

    /// Same as [`dispatch`](Self::dispatch) for a caller already holding
    /// the lock. Events are sent under the lock to keep them ordered.
    pub fn dispatch_locked(&self, state: &mut EngineState, action: Action) -> Vec<UploadEvent> {
        let events = state.apply(action);
        for event in &events {
            self.emit(event.clone());
        }
        events
    }

    pub fn emit(&self, event: UploadEvent) {
        // Nobody listening is fine.
        let _ = self.events_tx.send(event);
    }

    /// Starts a new attempt for `id` with freshly resolved params.
    pub fn upload(self: &Arc<Self>, id: FileId) {
        let Some(size) = self.lock().file(id).map(|f| f.meta.size) else {
            debug!(file = %id, "upload of unknown file ignored");
            return;
        };
        let mode = transfer_mode(&self.config, size);
        let chunks = mode.as_ref().map(|m| m.chunk_slots()).unwrap_or(0);

        let (meta, content, attempt) = {
            let mut state = self.lock();
            state.registry.abort_file(id);
            self.dispatch_locked(
                &mut state,
                Action::BeginAttempt {
                    id,
                    chunks,
                    now: Utc::now(),
                },
            );
            match state.file(id) {
                Some(file) => (file.meta.clone(), file.content.clone(), file.attempt),
                None => return,
            }
        };

        let mode = match mode {
            Ok(mode) => mode,
            Err(e) => {
                warn!(file = %id, error = %e, "chunked upload needs a positive chunk size, transfer skipped");
                return;
            }
        };

        let units = match plan_transfer(&meta, &content, mode, self.hooks.as_ref(), self.config.timeout()) {
            Ok(units) => units,
            Err(e) => {
                error!(file = %id, name = %meta.name, error = %e, "could not resolve upload params");
                self.dispatch(Action::Attempt {
                    id,
                    attempt,
                    update: AttemptUpdate::Status(UploadStatus::ErrorUploadParams),
                });
                return;
            }
        };

        self.dispatch(Action::Attempt {
            id,
            attempt,
            update: AttemptUpdate::Status(UploadStatus::Started),
        });
        self.launch(id, attempt, units);
    }

    pub fn cancel(&self, id: FileId) {
        let mut state = self.lock();
        let events = self.dispatch_locked(&mut state, Action::Cancel(id));
        if events.is_empty() {
            debug!(file = %id, "cancel ignored, file is not uploading");
            return;
        }
        let aborted = state.registry.abort_file(id);
        info!(file = %id, requests = aborted, "upload cancelled");
    }
}

/// Client-side upload engine.
///
/// Operations must run inside a Tokio runtime: uploads are spawned onto the
/// current one. Dropping the engine aborts every outstanding request.
pub struct UploadEngine {
    pub(crate) inner: Arc<Inner>,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
}

impl UploadEngine {
    pub fn new(
        config: EngineConfig,
        hooks: Arc<dyn UploadHooks>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                config,
                hooks,
                transport,
                state: Mutex::new(EngineState::default()),
                intake: Mutex::new(()),
                events_tx,
            }),
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Starts (or starts over) the upload of one file.
    pub fn upload(&self, id: FileId) {
        self.inner.upload(id);
    }

    /// Aborts the transfer of an uploading file. No-op in any other state.
    pub fn cancel(&self, id: FileId) {
        self.inner.cancel(id);
    }

    /// Cancels if uploading, then runs a fresh attempt from zero progress.
    pub fn restart(&self, id: FileId) {
        if self.inner.lock().file(id).is_none() {
            debug!(file = %id, "restart of unknown file ignored");
            return;
        }
        self.inner.cancel(id);
        self.inner.dispatch(Action::SetStatus {
            id,
            status: UploadStatus::Restarted,
        });
        self.inner.upload(id);
    }

    /// Stops tracking a file, aborting its transfer first if uploading.
    pub fn remove(&self, id: FileId) {
        let preview = {
            let mut state = self.inner.lock();
            let Some(file) = state.file(id) else {
                debug!(file = %id, "remove of unknown file ignored");
                return;
            };
            let preview = file.meta.preview.clone();
            self.inner.dispatch_locked(&mut state, Action::Cancel(id));
            state.registry.abort_file(id);
            self.inner.dispatch_locked(&mut state, Action::Remove(id));
            preview
        };
        if let Some(preview) = preview {
            self.inner.hooks.release_preview(&preview);
        }
        info!(file = %id, "file removed");
    }

    /// Restarts every tracked file.
    pub fn upload_all(&self) {
        let ids: Vec<FileId> = self.inner.lock().files.iter().map(TrackedFile::id).collect();
        for id in ids {
            self.restart(id);
        }
    }

    /// Snapshot of every tracked file, in intake order.
    pub fn files(&self) -> Vec<TrackedFile> {
        self.inner.lock().files.clone()
    }

    pub fn file(&self, id: FileId) -> Option<TrackedFile> {
        self.inner.lock().file(id).cloned()
    }

    /// Candidates rejected by the latest intake batch.
    pub fn rejected_files(&self) -> Vec<RejectedEntry> {
        self.inner.lock().rejected.clone()
    }

    /// Number of requests of `id` still in flight.
    pub fn active_transfers(&self, id: FileId) -> usize {
        self.inner.lock().registry.active_for(id)
    }

    /// Aborts every outstanding request and stops applying updates.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if !state.running {
            return;
        }
        state.running = false;
        state.hovered.clear();
        let aborted = state.registry.abort_all();
        info!(requests = aborted, "upload engine stopped");
    }
}

impl Drop for UploadEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

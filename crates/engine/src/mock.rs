//! Test doubles for the engine's seams.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dropload_protocol::{FileError, UploadParams};
use tokio::sync::oneshot;

use crate::error::{ParamsError, TransportError};
use crate::hooks::UploadHooks;
use crate::transport::{ProgressSink, Transport, TransportFuture, TransportRequest, TransportResponse};
use crate::types::{CandidateFile, FileId, FileMeta, Preview, TrackedFile};

type Reply = Result<TransportResponse, TransportError>;

struct Pending {
    progress: ProgressSink,
    reply: Option<oneshot::Sender<Reply>>,
}

/// Scripted transport: either answers at once or holds every request until
/// the test replies.
pub(crate) struct MockTransport {
    immediate: Option<(u16, Bytes)>,
    requests: Mutex<Vec<TransportRequest>>,
    pending: Mutex<Vec<Pending>>,
}

impl MockTransport {
    /// Answers every request with `status` after reporting half and full
    /// progress.
    pub fn respond(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            immediate: Some((status, Bytes::from_static(body.as_bytes()))),
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Holds every request until [`reply`](Self::reply) is called.
    pub fn hold() -> Arc<Self> {
        Arc::new(Self {
            immediate: None,
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received so far, answered or not.
    pub fn received(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Index of the latest request carrying `chunk_id`.
    pub fn index_of_chunk(&self, chunk_id: &str) -> usize {
        self.index_where("X-Chunk-Id", chunk_id)
    }

    /// Index of the latest request for the file named `name`.
    pub fn index_of_file(&self, name: &str) -> usize {
        self.index_where("X-Content-Name", name)
    }

    fn index_where(&self, header: &str, value: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rposition(|r| r.header(header) == Some(value))
            .unwrap()
    }

    /// Reports progress on the `index`-th received request.
    pub fn progress(&self, index: usize, loaded: u64, total: u64) {
        let sink = self.pending.lock().unwrap()[index].progress.clone();
        sink.report(loaded, Some(total));
    }

    /// Answers the `index`-th received request.
    pub fn reply(&self, index: usize, reply: Reply) {
        let tx = self.pending.lock().unwrap()[index].reply.take();
        if let Some(tx) = tx {
            let _ = tx.send(reply);
        }
    }

    pub fn reply_status(&self, index: usize, status: u16) {
        self.reply(index, Ok(TransportResponse::new(status, Bytes::new())));
    }
}

impl Transport for MockTransport {
    fn send(&self, request: TransportRequest, progress: ProgressSink) -> TransportFuture<'_> {
        let len = request.body.content_len();
        self.requests.lock().unwrap().push(request);

        match &self.immediate {
            Some((status, body)) => {
                let response = TransportResponse::new(*status, body.clone());
                Box::pin(async move {
                    progress.report(len / 2, Some(len));
                    progress.report(len, Some(len));
                    Ok(response)
                })
            }
            None => {
                let (tx, rx) = oneshot::channel();
                self.pending.lock().unwrap().push(Pending {
                    progress,
                    reply: Some(tx),
                });
                Box::pin(async move { rx.await.unwrap_or(Err(TransportError::Aborted)) })
            }
        }
    }
}

/// Hooks that record what the engine called.
#[derive(Default)]
pub(crate) struct RecordingHooks {
    pub fail_params: bool,
    pub with_preview: bool,
    /// Names the custom validator rejects.
    pub reject_names: Vec<String>,
    pub uploaded: Mutex<Vec<FileId>>,
    pub released: Mutex<Vec<Preview>>,
}

impl RecordingHooks {
    pub fn uploaded(&self) -> Vec<FileId> {
        self.uploaded.lock().unwrap().clone()
    }
}

impl UploadHooks for RecordingHooks {
    fn upload_params(&self, _file: &FileMeta) -> Result<UploadParams, ParamsError> {
        if self.fail_params {
            return Err(ParamsError::Unavailable("signing service down".into()));
        }
        Ok(UploadParams::new("http://localhost/upload"))
    }

    fn validate(&self, file: &CandidateFile) -> Vec<FileError> {
        if self.reject_names.iter().any(|n| n == file.name()) {
            vec![FileError::custom("name-blocked", "File name is not allowed")]
        } else {
            Vec::new()
        }
    }

    fn on_file_uploaded(&self, file: &TrackedFile, _all: &[TrackedFile]) {
        self.uploaded.lock().unwrap().push(file.id());
    }

    fn preview(&self, file: &CandidateFile) -> Option<Preview> {
        self.with_preview.then(|| Preview {
            preview_url: Some(format!("blob:{}", file.name())),
            ..Preview::default()
        })
    }

    fn release_preview(&self, preview: &Preview) {
        self.released.lock().unwrap().push(preview.clone());
    }
}

/// Polls `cond` while letting spawned transfer tasks run.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

//! End-to-end lifecycle through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dropload_engine::{
    CandidateFile, EngineConfig, FileMeta, ParamsError, ParamsFn, ProgressSink, RequestBody,
    TrackedFile, Transport, TransportError, TransportFuture, TransportRequest, TransportResponse,
    UploadEngine, UploadEvent, UploadHooks, UploadParams, UploadStatus,
};

/// Records each request's file name, chunk id and body, answering 201 after
/// a short delay. Files named `broken*` get a 500.
#[derive(Default)]
struct RecordingServer {
    received: Mutex<Vec<(String, Bytes)>>,
    names: Mutex<Vec<String>>,
}

impl Transport for RecordingServer {
    fn send(&self, request: TransportRequest, progress: ProgressSink) -> TransportFuture<'_> {
        Box::pin(async move {
            let chunk_id = request.header("X-Chunk-Id").unwrap_or_default().to_string();
            let name = request.header("X-Content-Name").unwrap_or_default().to_string();
            self.names.lock().unwrap().push(name.clone());
            let content = match request.body {
                RequestBody::Form { content, .. } => content,
                RequestBody::Raw(body) => body,
            };
            let total = content.len() as u64;
            progress.report(total / 2, Some(total));
            tokio::time::sleep(Duration::from_millis(2)).await;
            progress.report(total, Some(total));
            self.received.lock().unwrap().push((chunk_id, content));

            if name.starts_with("broken") {
                Ok(TransportResponse::new(500, "internal error"))
            } else {
                Ok(TransportResponse::new(201, ""))
            }
        })
    }
}

struct Hooks {
    completed: Mutex<Vec<(String, usize)>>,
}

impl UploadHooks for Hooks {
    fn upload_params(&self, file: &FileMeta) -> Result<UploadParams, ParamsError> {
        Ok(UploadParams::new(format!("http://uploads.test/{}", file.id)))
    }

    fn on_file_uploaded(&self, file: &TrackedFile, all: &[TrackedFile]) {
        self.completed
            .lock()
            .unwrap()
            .push((file.meta.name.clone(), all.len()));
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

fn finished(engine: &UploadEngine) -> bool {
    engine.files().iter().all(|f| f.status().is_finished())
}

#[tokio::test]
async fn chunked_files_are_reassembled_by_chunk_id() {
    let server = Arc::new(RecordingServer::default());
    let hooks = Arc::new(Hooks {
        completed: Mutex::new(Vec::new()),
    });
    let config = EngineConfig {
        chunks: true,
        chunk_size: Some(3),
        ..EngineConfig::default()
    };
    let engine = UploadEngine::new(config, hooks.clone(), server.clone());

    let content: Vec<u8> = (0u8..10).collect();
    let report = engine.add_files(vec![CandidateFile::new("data.bin", "application/octet-stream", content.clone())]);
    let id = report.accepted[0];
    wait_until(|| finished(&engine)).await;

    let file = engine.file(id).unwrap();
    assert_eq!(file.status(), UploadStatus::Done);
    assert_eq!(file.meta.chunk_progress.len(), 4);

    let mut received = server.received.lock().unwrap().clone();
    received.sort_by_key(|(chunk_id, _)| chunk_id.clone());
    let ids: Vec<_> = received.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, ["data.bin-0", "data.bin-1", "data.bin-2", "data.bin-3"]);
    let joined: Vec<u8> = received.iter().flat_map(|(_, c)| c.to_vec()).collect();
    assert_eq!(joined, content);

    assert_eq!(*hooks.completed.lock().unwrap(), vec![("data.bin".to_string(), 1)]);
}

#[tokio::test]
async fn mixed_batch_settles_each_file() {
    let server = Arc::new(RecordingServer::default());
    let hooks = Arc::new(Hooks {
        completed: Mutex::new(Vec::new()),
    });
    let config = EngineConfig {
        accept: ".txt,.log".into(),
        max_size_bytes: 64,
        ..EngineConfig::default()
    };
    let mut engine = UploadEngine::new(config, hooks.clone(), server.clone());
    let mut events = engine.take_events().unwrap();

    let report = engine.add_files(vec![
        CandidateFile::new("notes.txt", "text/plain", "some notes"),
        CandidateFile::new("broken.log", "text/plain", "oops"),
        CandidateFile::new("photo.jpg", "image/jpeg", vec![0u8; 8]),
        CandidateFile::new("huge.txt", "text/plain", vec![b'x'; 65]),
    ]);
    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.rejected, 2);
    wait_until(|| finished(&engine)).await;

    let files = engine.files();
    assert_eq!(files[0].status(), UploadStatus::Done);
    assert_eq!(files[1].status(), UploadStatus::ErrorUpload);
    assert_eq!(
        files[1].meta.failure,
        Some(dropload_engine::FailureKind::ServerError)
    );

    let rejected: Vec<_> = engine
        .rejected_files()
        .iter()
        .map(|r| (r.file.name().to_string(), r.status))
        .collect();
    assert_eq!(
        rejected,
        vec![
            ("photo.jpg".to_string(), UploadStatus::RejectedFileType),
            ("huge.txt".to_string(), UploadStatus::ErrorFileSize),
        ]
    );
    assert_eq!(hooks.completed.lock().unwrap().len(), 1);

    // Only the accepted files reached the server.
    assert_eq!(server.received.lock().unwrap().len(), 2);
    let mut names = server.names.lock().unwrap().clone();
    names.sort();
    assert_eq!(names, ["broken.log", "notes.txt"]);

    let mut added = 0;
    let mut rejected_events = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            UploadEvent::Added { .. } => added += 1,
            UploadEvent::Rejected { count } => rejected_events += count,
            _ => {}
        }
    }
    assert_eq!(added, 2);
    assert_eq!(rejected_events, 2);
}

#[tokio::test]
async fn params_closure_and_restart() {
    let server = Arc::new(RecordingServer::default());
    let attempts = Arc::new(Mutex::new(0));
    let hooks = {
        let attempts = Arc::clone(&attempts);
        ParamsFn::new(move |_: &FileMeta| {
            let mut n = attempts.lock().unwrap();
            *n += 1;
            if *n == 1 {
                Err(ParamsError::Unavailable("not signed in".into()))
            } else {
                Ok(UploadParams::new("http://uploads.test/retry"))
            }
        })
    };
    let engine = UploadEngine::new(EngineConfig::default(), Arc::new(hooks), server.clone());

    let id = engine.add_files(vec![CandidateFile::new("a.txt", "text/plain", "abc")]).accepted[0];
    assert_eq!(engine.file(id).unwrap().status(), UploadStatus::ErrorUploadParams);

    engine.restart(id);
    wait_until(|| engine.file(id).unwrap().status() == UploadStatus::Done).await;
    assert_eq!(*attempts.lock().unwrap(), 2);
    assert_eq!(server.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dropping_the_engine_aborts_transfers() {
    /// Counts request futures dropped before they finished.
    struct Abandoned(Arc<AtomicUsize>);

    impl Drop for Abandoned {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Stalled {
        abandoned: Arc<AtomicUsize>,
    }

    impl Transport for Stalled {
        fn send(&self, _request: TransportRequest, _progress: ProgressSink) -> TransportFuture<'_> {
            let guard = Abandoned(Arc::clone(&self.abandoned));
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                std::mem::forget(guard);
                Err(TransportError::Timeout)
            })
        }
    }

    let abandoned = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(Stalled {
        abandoned: Arc::clone(&abandoned),
    });
    let hooks = Arc::new(ParamsFn::new(|_: &FileMeta| Ok(UploadParams::new("http://uploads.test/"))));
    let engine = UploadEngine::new(EngineConfig::default(), hooks, transport);
    let id = engine
        .add_files(vec![
            CandidateFile::new("a.txt", "text/plain", "abc"),
            CandidateFile::new("b.txt", "text/plain", "def"),
        ])
        .accepted[0];
    wait_until(|| engine.active_transfers(id) == 1).await;
    assert_eq!(abandoned.load(Ordering::SeqCst), 0);

    drop(engine);
    wait_until(|| abandoned.load(Ordering::SeqCst) == 2).await;
}

//! Transfer strategies.
//!
//! A file goes out either as one request or as one request per fixed-size
//! chunk. Planning resolves the caller's upload params for every request
//! before anything is sent; execution spawns one task per request and
//! feeds progress and completion back into the reducer.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use dropload_protocol::constants::{
    FORM_FILE_FIELD, HEADER_CHUNK_ID, HEADER_CHUNK_LENGTH, HEADER_CONTENT_ID,
    HEADER_CONTENT_LENGTH, HEADER_CONTENT_NAME, WHOLE_FILE_CHUNK_ID,
};
use dropload_protocol::{FailureKind, StatusMessage, UploadParams, UploadStatus};
use dropload_transfer::{ChunkSpec, TransferError, percent_complete, plan_chunks};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::controller::Inner;
use crate::error::{ParamsError, TransportError};
use crate::hooks::UploadHooks;
use crate::registry::TransferKey;
use crate::state::{Action, AttemptUpdate};
use crate::transport::{ProgressSink, RequestBody, TransportRequest, TransportResponse};
use crate::types::{FileId, FileMeta, UploadEvent};

/// How a file is split into requests.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mode {
    Whole,
    Chunked(Vec<ChunkSpec>),
}

impl Mode {
    /// Number of chunk progress slots the file carries.
    pub fn chunk_slots(&self) -> usize {
        match self {
            Mode::Whole => 0,
            Mode::Chunked(chunks) => chunks.len(),
        }
    }
}

/// Picks the strategy for a file of `size` bytes.
///
/// Chunked mode without a positive chunk size is a misconfiguration. An
/// empty file has no chunks and goes out as a single request.
pub(crate) fn transfer_mode(config: &EngineConfig, size: u64) -> Result<Mode, TransferError> {
    if !config.chunks {
        return Ok(Mode::Whole);
    }
    let chunk_size = config.chunk_size.unwrap_or(0);
    let chunks = plan_chunks(size, chunk_size)?;
    if chunks.is_empty() {
        Ok(Mode::Whole)
    } else {
        Ok(Mode::Chunked(chunks))
    }
}

/// A fully resolved request, ready to send.
#[derive(Debug)]
pub(crate) struct TransferUnit {
    pub key: TransferKey,
    pub request: TransportRequest,
}

/// Resolves params and builds every request of one attempt.
///
/// Fails as a whole if any request's params cannot be resolved, so either
/// all requests are sent or none.
pub(crate) fn plan_transfer(
    meta: &FileMeta,
    content: &Bytes,
    mode: Mode,
    hooks: &dyn UploadHooks,
    timeout: Option<Duration>,
) -> Result<Vec<TransferUnit>, ParamsError> {
    match mode {
        Mode::Whole => {
            let params = resolve_params(hooks, meta)?;
            let request = build_request(
                meta,
                params,
                content.clone(),
                WHOLE_FILE_CHUNK_ID,
                &meta.name,
                timeout,
            );
            Ok(vec![TransferUnit {
                key: TransferKey::whole(meta.id),
                request,
            }])
        }
        Mode::Chunked(chunks) => chunks
            .into_iter()
            .map(|chunk| -> Result<TransferUnit, ParamsError> {
                let params = resolve_params(hooks, meta)?;
                let name = hooks.chunk_name(meta, chunk.index);
                let slice = content.slice(chunk.range.start as usize..chunk.range.end as usize);
                let request = build_request(meta, params, slice, &name, &name, timeout);
                Ok(TransferUnit {
                    key: TransferKey::chunk(meta.id, chunk.index),
                    request,
                })
            })
            .collect(),
    }
}

fn resolve_params(hooks: &dyn UploadHooks, meta: &FileMeta) -> Result<UploadParams, ParamsError> {
    let params = hooks.upload_params(meta)?;
    if params.url.is_empty() {
        return Err(ParamsError::MissingUrl);
    }
    Ok(params)
}

/// Builds one request: identification headers first, then the caller's
/// headers, which win on a name clash.
fn build_request(
    meta: &FileMeta,
    params: UploadParams,
    content: Bytes,
    chunk_id: &str,
    file_name: &str,
    timeout: Option<Duration>,
) -> TransportRequest {
    let headers = vec![
        (HEADER_CONTENT_NAME.to_string(), meta.name.clone()),
        (HEADER_CONTENT_LENGTH.to_string(), meta.size.to_string()),
        (HEADER_CONTENT_ID.to_string(), meta.id.to_string()),
        (HEADER_CHUNK_LENGTH.to_string(), content.len().to_string()),
        (HEADER_CHUNK_ID.to_string(), chunk_id.to_string()),
    ];
    let body = match params.body {
        Some(raw) => RequestBody::Raw(raw),
        None => RequestBody::Form {
            fields: params.fields,
            file_field: FORM_FILE_FIELD.to_string(),
            file_name: file_name.to_string(),
            mime_type: meta.mime_type.clone(),
            content,
        },
    };

    let mut request = TransportRequest {
        method: params.method,
        url: params.url,
        headers,
        body,
        timeout,
    };
    for (name, value) in params.headers {
        request.set_header(name, value);
    }
    request
}

impl Inner {
    /// Registers every unit under `attempt`, marks the file uploading and
    /// spawns the transfer tasks.
    pub(crate) fn launch(self: &Arc<Self>, id: FileId, attempt: u64, units: Vec<TransferUnit>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(file = %id, "no Tokio runtime to run the upload on");
            self.dispatch(Action::Attempt {
                id,
                attempt,
                update: AttemptUpdate::Failed {
                    status: UploadStatus::ExceptionUpload,
                    failure: Some(FailureKind::Unknown),
                },
            });
            return;
        };

        let mut tasks = Vec::with_capacity(units.len());
        {
            let mut state = self.lock();
            let current = state.file(id).map(|f| f.attempt);
            if !state.running || current != Some(attempt) {
                debug!(file = %id, attempt, "attempt superseded before launch");
                return;
            }
            for unit in units {
                let cancel = CancellationToken::new();
                state.registry.register(unit.key, attempt, cancel.clone());
                tasks.push((unit, cancel));
            }
            self.dispatch_locked(
                &mut state,
                Action::Attempt {
                    id,
                    attempt,
                    update: AttemptUpdate::Status(UploadStatus::Uploading),
                },
            );
        }

        info!(file = %id, attempt, requests = tasks.len(), "upload started");
        for (unit, cancel) in tasks {
            let inner = Arc::clone(self);
            runtime.spawn(async move { inner.run_unit(id, attempt, unit, cancel).await });
        }
    }

    async fn run_unit(
        self: Arc<Self>,
        id: FileId,
        attempt: u64,
        unit: TransferUnit,
        cancel: CancellationToken,
    ) {
        let chunk = unit.key.chunk;
        let sink = {
            let inner = Arc::clone(&self);
            ProgressSink::new(move |loaded, total| {
                let Some(total) = total else {
                    return;
                };
                inner.dispatch(Action::Attempt {
                    id,
                    attempt,
                    update: AttemptUpdate::Progress {
                        chunk,
                        percent: percent_complete(loaded, total),
                        now: Utc::now(),
                    },
                });
            })
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Aborted),
            result = self.transport.send(unit.request, sink) => result,
        };
        self.settle(id, attempt, unit.key, result, cancel.is_cancelled());
    }

    /// Applies the outcome of one request.
    fn settle(
        &self,
        id: FileId,
        attempt: u64,
        key: TransferKey,
        result: Result<TransportResponse, TransportError>,
        cancelled: bool,
    ) {
        let update = classify(id, key, result, cancelled);
        let failed = matches!(update, AttemptUpdate::Failed { .. });

        let snapshot = {
            let mut state = self.lock();
            state.registry.release(key, attempt);
            let events = self.dispatch_locked(&mut state, Action::Attempt { id, attempt, update });
            if failed && !events.is_empty() {
                // Siblings of a failed chunk are abandoned.
                state.registry.abort_file(id);
            }
            let done = events.iter().any(|e| {
                matches!(
                    e,
                    UploadEvent::StatusChanged {
                        status: UploadStatus::Done,
                        ..
                    }
                )
            });
            done.then(|| state.files.clone())
        };

        if let Some(all) = snapshot
            && let Some(file) = all.iter().find(|f| f.meta.id == id)
        {
            info!(file = %id, name = %file.meta.name, "upload completed");
            self.hooks.on_file_uploaded(file, &all);
        }
    }
}

fn classify(
    id: FileId,
    key: TransferKey,
    result: Result<TransportResponse, TransportError>,
    cancelled: bool,
) -> AttemptUpdate {
    let chunk = key.chunk;
    match result {
        Ok(response) if response.is_success() => AttemptUpdate::Loaded { chunk },
        Ok(response) => match StatusMessage::parse_status(&response.body) {
            Some(UploadStatus::Done) => AttemptUpdate::Loaded { chunk },
            Some(status) if status.is_finished() || status.is_rejection() => {
                warn!(file = %id, ?chunk, http_status = response.status, %status, "server set upload status");
                AttemptUpdate::Failed {
                    status,
                    failure: None,
                }
            }
            _ => {
                let failure = FailureKind::from_http_status(response.status);
                error!(file = %id, ?chunk, http_status = response.status, %failure, "upload failed");
                AttemptUpdate::Failed {
                    status: UploadStatus::ErrorUpload,
                    failure: Some(failure),
                }
            }
        },
        Err(TransportError::Aborted) if cancelled => {
            debug!(file = %id, ?chunk, "transfer aborted");
            AttemptUpdate::Failed {
                status: UploadStatus::Aborted,
                failure: Some(FailureKind::Aborted),
            }
        }
        Err(TransportError::Aborted) => {
            error!(file = %id, ?chunk, "transfer aborted by transport");
            AttemptUpdate::Failed {
                status: UploadStatus::Aborted,
                failure: Some(FailureKind::Aborted),
            }
        }
        Err(e @ TransportError::Request(_)) => {
            error!(file = %id, ?chunk, error = %e, "upload request failed");
            AttemptUpdate::Failed {
                status: UploadStatus::ExceptionUpload,
                failure: Some(e.failure_kind()),
            }
        }
        Err(e) => {
            let failure = e.failure_kind();
            error!(file = %id, ?chunk, error = %e, %failure, "upload failed");
            AttemptUpdate::Failed {
                status: UploadStatus::ErrorUpload,
                failure: Some(failure),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::ParamsFn;
    use crate::types::{CandidateFile, TrackedFile};
    use dropload_protocol::Method;

    fn tracked(name: &str, size: usize) -> TrackedFile {
        TrackedFile::from_candidate(
            CandidateFile::new(name, "video/mp4", (0..size).map(|i| i as u8).collect::<Vec<_>>()),
            None,
            Utc::now(),
        )
    }

    fn chunked(size: Option<u64>) -> EngineConfig {
        EngineConfig {
            chunks: true,
            chunk_size: size,
            ..EngineConfig::default()
        }
    }

    fn params_ok() -> ParamsFn<impl Fn(&FileMeta) -> Result<UploadParams, ParamsError>> {
        ParamsFn::new(|_: &FileMeta| {
            Ok(UploadParams::new("http://localhost/upload")
                .with_field("folder", "inbox")
                .with_header("Authorization", "Bearer t"))
        })
    }

    #[test]
    fn mode_selection() {
        assert_eq!(transfer_mode(&EngineConfig::default(), 10).unwrap(), Mode::Whole);
        assert_eq!(transfer_mode(&chunked(Some(4)), 10).unwrap().chunk_slots(), 3);
        assert_eq!(transfer_mode(&chunked(Some(4)), 0).unwrap(), Mode::Whole);
        assert!(transfer_mode(&chunked(None), 10).is_err());
        assert!(transfer_mode(&chunked(Some(0)), 10).is_err());
    }

    #[test]
    fn whole_file_request() {
        let file = tracked("clip.mp4", 10);
        let units = plan_transfer(&file.meta, &file.content, Mode::Whole, &params_ok(), None).unwrap();
        assert_eq!(units.len(), 1);
        let req = &units[0].request;
        assert_eq!(units[0].key, TransferKey::whole(file.meta.id));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("X-Content-Name"), Some("clip.mp4"));
        assert_eq!(req.header("X-Content-Length"), Some("10"));
        assert_eq!(req.header("X-Content-Id"), Some(file.meta.id.to_string().as_str()));
        assert_eq!(req.header("X-Chunk-Length"), Some("10"));
        assert_eq!(req.header("X-Chunk-Id"), Some("0"));
        assert_eq!(req.header("Authorization"), Some("Bearer t"));
        match &req.body {
            RequestBody::Form {
                fields,
                file_field,
                content,
                ..
            } => {
                assert_eq!(fields.get("folder").map(String::as_str), Some("inbox"));
                assert_eq!(file_field, "chunk");
                assert_eq!(content.len(), 10);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn chunked_requests_cover_the_file() {
        let file = tracked("movie.mp4", 10);
        let mode = transfer_mode(&chunked(Some(4)), 10).unwrap();
        let units = plan_transfer(&file.meta, &file.content, mode, &params_ok(), None).unwrap();
        assert_eq!(units.len(), 3);

        let lengths: Vec<_> = units.iter().map(|u| u.request.header("X-Chunk-Length").unwrap()).collect();
        assert_eq!(lengths, ["4", "4", "2"]);
        let ids: Vec<_> = units.iter().map(|u| u.request.header("X-Chunk-Id").unwrap()).collect();
        assert_eq!(ids, ["movie.mp4-0", "movie.mp4-1", "movie.mp4-2"]);
        for unit in &units {
            assert_eq!(unit.request.header("X-Content-Length"), Some("10"));
        }
        match &units[2].request.body {
            RequestBody::Form { content, .. } => assert_eq!(&content[..], &[8u8, 9]),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn caller_headers_override_engine_headers() {
        let file = tracked("a.mp4", 3);
        let hooks = ParamsFn::new(|_: &FileMeta| {
            Ok(UploadParams::new("http://localhost/upload").with_header("x-chunk-id", "custom"))
        });
        let units = plan_transfer(&file.meta, &file.content, Mode::Whole, &hooks, None).unwrap();
        assert_eq!(units[0].request.header("X-Chunk-Id"), Some("custom"));
        assert_eq!(units[0].request.headers.len(), 5);
    }

    #[test]
    fn raw_body_replaces_form() {
        let file = tracked("a.mp4", 3);
        let hooks = ParamsFn::new(|_: &FileMeta| {
            Ok(UploadParams::new("http://localhost/upload")
                .with_method(Method::Put)
                .with_body("raw"))
        });
        let units = plan_transfer(
            &file.meta,
            &file.content,
            Mode::Whole,
            &hooks,
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let req = &units[0].request;
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.body, RequestBody::Raw(Bytes::from_static(b"raw")));
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn any_params_failure_fails_the_plan() {
        let file = tracked("movie.mp4", 10);
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let hooks = ParamsFn::new(|_: &FileMeta| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 1 {
                Err(ParamsError::Unavailable("token expired".into()))
            } else {
                Ok(UploadParams::new("http://localhost/upload"))
            }
        });
        let mode = transfer_mode(&chunked(Some(4)), 10).unwrap();
        let err = plan_transfer(&file.meta, &file.content, mode, &hooks, None).unwrap_err();
        assert!(matches!(err, ParamsError::Unavailable(_)));
    }

    #[test]
    fn empty_url_is_a_params_failure() {
        let file = tracked("a.mp4", 3);
        let hooks = ParamsFn::new(|_: &FileMeta| Ok(UploadParams::default()));
        let err = plan_transfer(&file.meta, &file.content, Mode::Whole, &hooks, None).unwrap_err();
        assert!(matches!(err, ParamsError::MissingUrl));
    }

    #[test]
    fn classify_responses() {
        let id = FileId::new();
        let key = TransferKey::whole(id);
        let ok = classify(id, key, Ok(TransportResponse::new(201, "")), false);
        assert!(matches!(ok, AttemptUpdate::Loaded { chunk: None }));

        let not_found = classify(id, key, Ok(TransportResponse::new(404, "")), false);
        assert!(matches!(
            not_found,
            AttemptUpdate::Failed {
                status: UploadStatus::ErrorUpload,
                failure: Some(FailureKind::NotFound)
            }
        ));

        let named = classify(
            id,
            key,
            Ok(TransportResponse::new(409, r#"{"message":"error_validation"}"#)),
            false,
        );
        assert!(matches!(
            named,
            AttemptUpdate::Failed {
                status: UploadStatus::ErrorValidation,
                failure: None
            }
        ));

        // A status that leaves the file in flight is a plain failure.
        for body in [r#"{"message":"uploading"}"#, r#"{"message":"ready"}"#] {
            let in_flight = classify(id, key, Ok(TransportResponse::new(500, body)), false);
            assert!(matches!(
                in_flight,
                AttemptUpdate::Failed {
                    status: UploadStatus::ErrorUpload,
                    failure: Some(FailureKind::ServerError)
                }
            ));
        }

        let timeout = classify(id, key, Err(TransportError::Timeout), false);
        assert!(matches!(
            timeout,
            AttemptUpdate::Failed {
                status: UploadStatus::ErrorUpload,
                failure: Some(FailureKind::Timeout)
            }
        ));

        let bad = classify(id, key, Err(TransportError::Request("bad url".into())), false);
        assert!(matches!(
            bad,
            AttemptUpdate::Failed {
                status: UploadStatus::ExceptionUpload,
                ..
            }
        ));
    }
}

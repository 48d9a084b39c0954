//! Transport trait and request types.
//!
//! `Transport` is implemented by whatever actually moves bytes (the
//! `dropload-http` crate, a test double, ...). Keeping it a trait keeps the
//! lifecycle logic decoupled from the network and testable with mocks.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dropload_protocol::Method;

use crate::error::TransportError;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// Sends upload requests.
pub trait Transport: Send + Sync {
    /// Sends one request and resolves once the server answered.
    ///
    /// Implementations report upload progress through `progress`. Dropping
    /// the returned future aborts the request.
    fn send(&self, request: TransportRequest, progress: ProgressSink) -> TransportFuture<'_>;
}

/// Payload of an upload request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Multipart form: the text fields followed by the file part.
    Form {
        fields: BTreeMap<String, String>,
        /// Name of the file part (`chunk`).
        file_field: String,
        file_name: String,
        mime_type: String,
        content: Bytes,
    },
    /// Caller-supplied body, sent verbatim.
    Raw(Bytes),
}

impl RequestBody {
    /// Bytes the progress callback counts towards the total.
    pub fn content_len(&self) -> u64 {
        match self {
            RequestBody::Form { content, .. } => content.len() as u64,
            RequestBody::Raw(body) => body.len() as u64,
        }
    }
}

/// A single upload request: the whole file or one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// Headers in send order; names are unique case-insensitively.
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Looks up a header value, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any existing one with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
    }
}

/// Final answer of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Receives `(loaded, total)` byte counts while a request body is sent.
///
/// `total` is `None` when the length is not computable; such reports are
/// ignored by the engine.
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<dyn Fn(u64, Option<u64>) + Send + Sync>,
}

impl ProgressSink {
    pub fn new(f: impl Fn(u64, Option<u64>) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// A sink that discards every report.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn report(&self, loaded: u64, total: Option<u64>) {
        (self.inner)(loaded, total)
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

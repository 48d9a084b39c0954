//! HTTP transport.
//!
//! Async `reqwest` client implementing the engine's `Transport` trait.

use dropload_engine::{
    ProgressSink, RequestBody, Transport, TransportError, TransportFuture, TransportRequest,
    TransportResponse,
};
use reqwest::Body;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::progress::{DEFAULT_STEP, progress_stream};

/// Errors from building the HTTP transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Sends upload requests over HTTP(S).
pub struct HttpTransport {
    http: reqwest::Client,
    step: usize,
}

impl HttpTransport {
    /// Creates a transport with its own connection pool.
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("dropload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http))
    }

    /// Wraps an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            step: DEFAULT_STEP,
        }
    }

    /// Sets how many body bytes are written between progress reports.
    pub fn with_progress_step(mut self, bytes: usize) -> Self {
        self.step = bytes;
        self
    }

    async fn execute(
        &self,
        request: TransportRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let headers = header_map(&request.headers)?;

        let mut builder = self.http.request(method, &request.url).headers(headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            RequestBody::Form {
                fields,
                file_field,
                file_name,
                mime_type,
                content,
            } => {
                let len = content.len() as u64;
                let body = Body::wrap_stream(progress_stream(content, progress, self.step));
                let mut part = Part::stream_with_length(body, len).file_name(file_name);
                if !mime_type.is_empty() {
                    part = part
                        .mime_str(&mime_type)
                        .map_err(|e| TransportError::Request(e.to_string()))?;
                }
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value))
                    .part(file_field, part);
                builder.multipart(form)
            }
            RequestBody::Raw(content) => {
                let len = content.len();
                builder
                    .header(CONTENT_LENGTH, len)
                    .body(Body::wrap_stream(progress_stream(content, progress, self.step)))
            }
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_error)?;
        debug!(url = %request.url, status, bytes = body.len(), "upload response");

        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: TransportRequest, progress: ProgressSink) -> TransportFuture<'_> {
        Box::pin(self.execute(request, progress))
    }
}

/// Builds a header map, keeping non-ASCII values (file names) as raw bytes.
fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Request(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| TransportError::Request(format!("header {name}: {e}")))?;
        map.insert(header, value);
    }
    Ok(map)
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::Request(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Lifecycle state of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "rejected_file_type")]
    RejectedFileType,
    #[serde(rename = "rejected_max_files")]
    RejectedMaxFiles,
    #[serde(rename = "preparing")]
    Preparing,
    #[serde(rename = "error_file_size")]
    ErrorFileSize,
    #[serde(rename = "error_validation")]
    ErrorValidation,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "getting_upload_params")]
    GettingUploadParams,
    #[serde(rename = "error_upload_params")]
    ErrorUploadParams,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "exception_upload")]
    ExceptionUpload,
    #[serde(rename = "aborted")]
    Aborted,
    #[serde(rename = "restarted")]
    Restarted,
    #[serde(rename = "error_upload")]
    ErrorUpload,
    #[serde(rename = "headers_received")]
    HeadersReceived,
    #[serde(rename = "done")]
    Done,
}

impl UploadStatus {
    const ALL: [UploadStatus; 16] = [
        UploadStatus::RejectedFileType,
        UploadStatus::RejectedMaxFiles,
        UploadStatus::Preparing,
        UploadStatus::ErrorFileSize,
        UploadStatus::ErrorValidation,
        UploadStatus::Ready,
        UploadStatus::Started,
        UploadStatus::GettingUploadParams,
        UploadStatus::ErrorUploadParams,
        UploadStatus::Uploading,
        UploadStatus::ExceptionUpload,
        UploadStatus::Aborted,
        UploadStatus::Restarted,
        UploadStatus::ErrorUpload,
        UploadStatus::HeadersReceived,
        UploadStatus::Done,
    ];

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::RejectedFileType => "rejected_file_type",
            UploadStatus::RejectedMaxFiles => "rejected_max_files",
            UploadStatus::Preparing => "preparing",
            UploadStatus::ErrorFileSize => "error_file_size",
            UploadStatus::ErrorValidation => "error_validation",
            UploadStatus::Ready => "ready",
            UploadStatus::Started => "started",
            UploadStatus::GettingUploadParams => "getting_upload_params",
            UploadStatus::ErrorUploadParams => "error_upload_params",
            UploadStatus::Uploading => "uploading",
            UploadStatus::ExceptionUpload => "exception_upload",
            UploadStatus::Aborted => "aborted",
            UploadStatus::Restarted => "restarted",
            UploadStatus::ErrorUpload => "error_upload",
            UploadStatus::HeadersReceived => "headers_received",
            UploadStatus::Done => "done",
        }
    }

    /// Returns `true` for the states an upload attempt ends in.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            UploadStatus::Done
                | UploadStatus::ErrorUpload
                | UploadStatus::ErrorUploadParams
                | UploadStatus::ExceptionUpload
                | UploadStatus::Aborted
        )
    }

    /// Returns `true` for the intake-time rejection states.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            UploadStatus::RejectedFileType
                | UploadStatus::RejectedMaxFiles
                | UploadStatus::ErrorFileSize
                | UploadStatus::ErrorValidation
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UploadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownStatus(s.to_string()))
    }
}

/// HTTP method used for an upload request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Delete,
    Get,
    Head,
    Options,
    Patch,
    #[default]
    Post,
    Put,
}

impl Method {
    /// Returns the upper-case method token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    /// Parses a method name case-insensitively (`post` and `POST` both work).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(Method::Delete),
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            _ => Err(ProtocolError::UnknownMethod(s.to_string())),
        }
    }
}

/// Classified cause of a failed transfer, derived from the HTTP status code
/// or the transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    #[serde(rename = "failure_file-not-found")]
    NotFound,
    #[serde(rename = "failure_server-error")]
    ServerError,
    #[serde(rename = "failure_aborted")]
    Aborted,
    #[serde(rename = "failure_timeout")]
    Timeout,
    #[serde(rename = "failure_unknown")]
    Unknown,
}

impl FailureKind {
    /// Classifies an HTTP status code. `0` is what an aborted request reports.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            404 => FailureKind::NotFound,
            500 => FailureKind::ServerError,
            0 => FailureKind::Aborted,
            _ => FailureKind::Unknown,
        }
    }

    /// Human-readable diagnostic line.
    pub fn describe(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "file not found",
            FailureKind::ServerError => "server error",
            FailureKind::Aborted => "request aborted",
            FailureKind::Timeout => "request timed out",
            FailureKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Where and how to send a file, resolved by the caller for each attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadParams {
    pub url: String,
    #[serde(default)]
    pub method: Method,
    /// Sent verbatim instead of the multipart form when set.
    #[serde(skip)]
    pub body: Option<Bytes>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl UploadParams {
    /// Creates params posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_status_serialization() {
        assert_eq!(
            serde_json::to_string(&UploadStatus::GettingUploadParams).unwrap(),
            "\"getting_upload_params\""
        );
        assert_eq!(
            serde_json::to_string(&UploadStatus::Done).unwrap(),
            "\"done\""
        );
    }

    #[test]
    fn upload_status_wire_names_match_serde() {
        for status in UploadStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<UploadStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_error() {
        let err = "finished".parse::<UploadStatus>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStatus(s) if s == "finished"));
    }

    #[test]
    fn finished_and_rejection_sets_are_disjoint() {
        for status in UploadStatus::ALL {
            assert!(!(status.is_finished() && status.is_rejection()), "{status}");
        }
        assert!(UploadStatus::Done.is_finished());
        assert!(!UploadStatus::Uploading.is_finished());
        assert!(UploadStatus::RejectedMaxFiles.is_rejection());
    }

    #[test]
    fn method_parses_any_case() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Put".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn method_defaults_to_post() {
        assert_eq!(Method::default(), Method::Post);
        let params: UploadParams = serde_json::from_str(r#"{"url":"http://x/upload"}"#).unwrap();
        assert_eq!(params.method, Method::Post);
        assert!(params.fields.is_empty());
        assert!(params.body.is_none());
    }

    #[test]
    fn failure_kind_from_status() {
        assert_eq!(FailureKind::from_http_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_http_status(500), FailureKind::ServerError);
        assert_eq!(FailureKind::from_http_status(0), FailureKind::Aborted);
        assert_eq!(FailureKind::from_http_status(418), FailureKind::Unknown);
        assert_eq!(
            serde_json::to_string(&FailureKind::NotFound).unwrap(),
            "\"failure_file-not-found\""
        );
    }

    #[test]
    fn params_builder_omits_empty_maps() {
        let params = UploadParams::new("https://example.com/up")
            .with_method(Method::Put)
            .with_header("Authorization", "Bearer t");
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"PUT\""));
        assert!(json.contains("Authorization"));
        assert!(!json.contains("fields"));
    }
}

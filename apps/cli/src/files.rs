//! Reading files from disk into upload candidates.

use std::path::Path;

use chrono::{DateTime, Utc};
use dropload_engine::CandidateFile;

/// Type given to files whose extension is not recognised. An empty type
/// would pass every accept pattern.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Reads `path` into a candidate, with its MIME type guessed from the
/// extension and its modification time when the filesystem reports one.
pub fn load_candidate(path: &Path) -> anyhow::Result<CandidateFile> {
    let content = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("{} has no usable file name", path.display()))?;
    let mime_type = detect_content_type(name).unwrap_or(FALLBACK_CONTENT_TYPE);

    let mut candidate = CandidateFile::new(name, mime_type, content);
    if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
        candidate = candidate.with_last_modified(DateTime::<Utc>::from(modified));
    }
    Ok(candidate)
}

/// Maps common file extensions to a MIME type.
pub fn detect_content_type(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("svg") => Some("image/svg+xml"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("mp3") => Some("audio/mpeg"),
        Some("pdf") => Some("application/pdf"),
        Some("zip") => Some("application/zip"),
        Some("json") => Some("application/json"),
        Some("txt" | "log") => Some("text/plain"),
        Some("csv") => Some("text/csv"),
        _ => None,
    }
}

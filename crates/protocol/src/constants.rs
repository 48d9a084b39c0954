/// Original file name of the uploaded file.
pub const HEADER_CONTENT_NAME: &str = "X-Content-Name";

/// Total byte size of the uploaded file.
pub const HEADER_CONTENT_LENGTH: &str = "X-Content-Length";

/// Engine-assigned id of the uploaded file.
pub const HEADER_CONTENT_ID: &str = "X-Content-Id";

/// Byte size of the body carried by this request.
pub const HEADER_CHUNK_LENGTH: &str = "X-Chunk-Length";

/// Identifier of the chunk carried by this request.
pub const HEADER_CHUNK_ID: &str = "X-Chunk-Id";

/// Multipart field holding the file (or chunk) content.
pub const FORM_FILE_FIELD: &str = "chunk";

/// MIME type reported for every drag item by old Firefox releases.
///
/// Candidates carrying it are always type-accepted.
pub const LEGACY_DRAG_MIME: &str = "application/x-moz-file";

/// Chunk id sent by single-request uploads.
pub const WHOLE_FILE_CHUNK_ID: &str = "0";

use serde::{Deserialize, Serialize};

/// What validation can see of a candidate file.
///
/// Drag-over items only expose a MIME type, so the name and size are
/// optional; checks that need them are skipped when they are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub mime_type: String,
}

impl FileInfo {
    /// Describes a complete file.
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            size: Some(size),
            mime_type: mime_type.into(),
        }
    }

    /// Describes a drag-over item, which only carries its MIME type.
    pub fn drag_item(mime_type: impl Into<String>) -> Self {
        Self {
            name: None,
            size: None,
            mime_type: mime_type.into(),
        }
    }
}

impl AsRef<FileInfo> for FileInfo {
    fn as_ref(&self) -> &FileInfo {
        self
    }
}

//! Engine configuration.
//!
//! Every field has a serde default, so a partial TOML or JSON table is a
//! valid configuration.

use std::time::Duration;

use dropload_transfer::Constraints;
use serde::{Deserialize, Serialize};

/// Largest integer a JavaScript-facing server can round-trip; the default
/// size and count limits. Also fits a TOML integer, unlike `u64::MAX`.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Intake constraints and transfer behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Comma-separated accept patterns (`.ext`, `type/*`, `type/subtype`).
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Allow more than one file per batch.
    #[serde(default = "default_true")]
    pub multiple: bool,

    #[serde(default)]
    pub min_size_bytes: u64,

    #[serde(default = "default_max")]
    pub max_size_bytes: u64,

    /// Maximum number of tracked files (0 = unlimited).
    #[serde(default = "default_max")]
    pub max_files: u64,

    /// Start uploading accepted files immediately.
    #[serde(default = "default_true")]
    pub auto_upload: bool,

    /// Per-request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Split files into `chunk_size` byte requests.
    #[serde(default)]
    pub chunks: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,

    /// Surface hint for UI layers; the engine does not read it.
    #[serde(default)]
    pub no_click: bool,

    /// Ignore intake while set.
    #[serde(default)]
    pub disabled: bool,
}

fn default_accept() -> String {
    "*".into()
}

fn default_true() -> bool {
    true
}

fn default_max() -> u64 {
    MAX_SAFE_INTEGER
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            multiple: default_true(),
            min_size_bytes: 0,
            max_size_bytes: default_max(),
            max_files: default_max(),
            auto_upload: default_true(),
            timeout_ms: None,
            chunks: false,
            chunk_size: None,
            no_click: false,
            disabled: false,
        }
    }
}

impl EngineConfig {
    /// Intake limits derived from this configuration.
    pub fn constraints(&self) -> Constraints {
        Constraints {
            accept: self.accept.clone(),
            multiple: self.multiple,
            min_size_bytes: self.min_size_bytes,
            max_size_bytes: self.max_size_bytes,
            max_files: self.max_files,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

//! CLI configuration.
//!
//! Configuration is stored as TOML, by default at
//! `~/.config/dropload/dropload.toml`:
//!
//! ```toml
//! [engine]
//! accept = "image/*,.pdf"
//! chunks = true
//! chunkSize = 5242880
//!
//! [upload]
//! url = "https://uploads.example.com/files/{name}"
//! method = "PUT"
//!
//! [upload.headers]
//! Authorization = "Bearer ..."
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dropload_engine::{EngineConfig, Method};
use serde::{Deserialize, Serialize};

/// Uploader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub upload: UploadTarget,
}

/// Where every file is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Target URL. `{name}` and `{id}` expand to the file name and id.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub method: Method,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Extra multipart form fields.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path()?, false),
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Headers may carry credentials.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

impl Config {
    /// Rejects configurations the engine would accept but never finish.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upload.url.is_empty() {
            anyhow::bail!("no upload URL configured (set [upload] url or pass --url)");
        }
        if self.engine.chunks && !self.engine.chunk_size.is_some_and(|n| n > 0) {
            anyhow::bail!("chunked uploads need a positive chunkSize");
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("dropload").join("dropload.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("dropload")
            .join("dropload.toml"))
    }
}

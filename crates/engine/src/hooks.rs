//! Caller-supplied behaviour.

use dropload_protocol::{FileError, UploadParams};

use crate::error::ParamsError;
use crate::types::{CandidateFile, FileMeta, Preview, TrackedFile};

/// Callbacks the engine invokes during intake and transfer.
///
/// Only [`upload_params`](UploadHooks::upload_params) is required. Hooks
/// run on the engine's caller or on transfer tasks, never under the engine
/// lock, so they may read engine state. `validate` and `preview` run while
/// the intake batch is open and must not offer another batch.
pub trait UploadHooks: Send + Sync {
    /// Resolves where and how to send `file`, once per request.
    fn upload_params(&self, file: &FileMeta) -> Result<UploadParams, ParamsError>;

    /// Name of chunk `index`, sent as the chunk id.
    fn chunk_name(&self, file: &FileMeta, index: usize) -> String {
        format!("{}-{}", file.name, index)
    }

    /// Extra intake checks; an empty result accepts the file.
    fn validate(&self, _file: &CandidateFile) -> Vec<FileError> {
        Vec::new()
    }

    /// Called once when a file reaches `done`, with a snapshot of all files.
    fn on_file_uploaded(&self, _file: &TrackedFile, _all: &[TrackedFile]) {}

    /// Display attributes for an accepted file.
    fn preview(&self, _file: &CandidateFile) -> Option<Preview> {
        None
    }

    /// Releases what [`preview`](UploadHooks::preview) allocated.
    fn release_preview(&self, _preview: &Preview) {}
}

/// Hooks built from a single upload-params closure.
pub struct ParamsFn<F>(F);

impl<F> ParamsFn<F>
where
    F: Fn(&FileMeta) -> Result<UploadParams, ParamsError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> UploadHooks for ParamsFn<F>
where
    F: Fn(&FileMeta) -> Result<UploadParams, ParamsError> + Send + Sync,
{
    fn upload_params(&self, file: &FileMeta) -> Result<UploadParams, ParamsError> {
        (self.0)(file)
    }
}

//! Client-side upload lifecycle engine.
//!
//! This crate holds the **business logic** of moving user-selected files to
//! a server. It has no UI or network dependencies: callers provide a
//! [`Transport`] (see `dropload-http`) and [`UploadHooks`] that resolve
//! where each file goes.
//!
//! # Lifecycle
//!
//! 1. **Intake**: validate a batch, track accepted files, list rejections
//! 2. **Params**: resolve upload params for every request of an attempt
//! 3. **Transfer**: send the whole file, or fixed-size chunks in parallel
//! 4. **Progress**: aggregate per-request progress and estimate time left
//! 5. **Settle**: classify the server answer into a file status

mod controller;
pub mod config;
pub mod error;
pub mod hooks;
mod intake;
mod registry;
mod state;
mod strategy;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

// Re-export primary types for convenience.
pub use config::EngineConfig;
pub use controller::UploadEngine;
pub use error::{ParamsError, TransportError};
pub use hooks::{ParamsFn, UploadHooks};
pub use intake::IntakeReport;
pub use transport::{
    ProgressSink, RequestBody, Transport, TransportFuture, TransportRequest, TransportResponse,
};
pub use types::{
    CandidateFile, DragState, FileId, FileMeta, Preview, RejectedEntry, TrackedFile, UploadEvent,
};

pub use dropload_protocol::{FailureKind, FileError, Method, UploadParams, UploadStatus};
pub use dropload_transfer::{ChunkProgress, FileInfo};

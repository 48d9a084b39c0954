//! Validation, chunk planning and progress arithmetic for uploads.
//!
//! Everything in this crate is synchronous and free of side effects; the
//! engine crate drives it from its lifecycle controller.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkSpec, chunk_count, plan_chunks};
pub use progress::{
    ChunkProgress, aggregate_chunk_progress, all_chunks_done, estimate_remaining_secs,
    estimated_seconds_remaining, percent_complete,
};
pub use types::FileInfo;
pub use validation::{
    BatchOutcome, Constraints, Rejection, all_files_accepted, file_accepted, file_match_size,
    partition_batch,
};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk size must be a positive number of bytes, got {0}")]
    InvalidChunkSize(u64),
}

use std::ops::Range;

use crate::TransferError;

/// One fixed-size byte range of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Zero-based position of the chunk within the file.
    pub index: usize,
    /// Byte range within the file.
    pub range: Range<u64>,
}

impl ChunkSpec {
    /// Size of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Number of chunks a file of `size` bytes splits into: `ceil(size / chunk_size)`.
///
/// Returns 0 for a zero chunk size.
pub fn chunk_count(size: u64, chunk_size: u64) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size) as usize
}

/// Splits `size` bytes into consecutive chunks of `chunk_size` bytes.
///
/// The last chunk holds the remainder and may be shorter.
pub fn plan_chunks(size: u64, chunk_size: u64) -> Result<Vec<ChunkSpec>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize(chunk_size));
    }

    let mut chunks = Vec::with_capacity(chunk_count(size, chunk_size));
    let mut start = 0;
    while start < size {
        let end = start.saturating_add(chunk_size).min(size);
        chunks.push(ChunkSpec {
            index: chunks.len(),
            range: start..end,
        });
        start = end;
    }
    Ok(chunks)
}

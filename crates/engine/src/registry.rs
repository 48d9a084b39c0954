//! Outstanding transfers, keyed by file and chunk.
//!
//! Every in-flight request owns one entry. Aborting cancels the entry's
//! token; the transfer task removes the entry itself once it has settled.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::types::FileId;

/// One request of one file: the whole file (`chunk: None`) or a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TransferKey {
    pub file: FileId,
    pub chunk: Option<usize>,
}

impl TransferKey {
    pub fn whole(file: FileId) -> Self {
        Self { file, chunk: None }
    }

    pub fn chunk(file: FileId, index: usize) -> Self {
        Self {
            file,
            chunk: Some(index),
        }
    }
}

#[derive(Debug)]
struct TransportHandle {
    attempt: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct TransportRegistry {
    handles: HashMap<TransferKey, TransportHandle>,
}

impl TransportRegistry {
    /// Records an in-flight request. An older handle under the same key is
    /// aborted and replaced.
    pub fn register(&mut self, key: TransferKey, attempt: u64, cancel: CancellationToken) {
        if let Some(old) = self.handles.insert(key, TransportHandle { attempt, cancel }) {
            old.cancel.cancel();
        }
    }

    /// Drops the entry for `key` if it still belongs to `attempt`.
    pub fn release(&mut self, key: TransferKey, attempt: u64) -> bool {
        match self.handles.get(&key) {
            Some(handle) if handle.attempt == attempt => {
                self.handles.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Aborts every request of `file`. Returns how many were signalled.
    pub fn abort_file(&self, file: FileId) -> usize {
        self.handles
            .iter()
            .filter(|(key, _)| key.file == file)
            .map(|(_, handle)| handle.cancel.cancel())
            .count()
    }

    /// Aborts and forgets every request.
    pub fn abort_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.cancel.cancel();
        }
        count
    }

    /// Number of requests of `file` still registered.
    pub fn active_for(&self, file: FileId) -> usize {
        self.handles.keys().filter(|key| key.file == file).count()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

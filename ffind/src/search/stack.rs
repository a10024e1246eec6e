//! Shared LIFO of directories waiting to be walked.
//!
//! The stack is filled by the seeding pass and then only drained. Every
//! operation takes the lock for a constant amount of work and nobody ever
//! waits on it for entries to show up: a worker that sees it empty is done.

use std::collections::TryReserveError;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::trace;

use crate::errors::FindError;

/// Returned by [`DirStack::push`] when the stack could not grow. The rejected
/// path is handed back so the caller still owns it.
#[derive(Debug, Error)]
#[error("failed to grow the directory stack")]
pub struct PushError {
    entry: PathBuf,
    #[source]
    source: TryReserveError,
}

impl PushError {
    pub fn into_inner(self) -> PathBuf {
        self.entry
    }
}

impl From<PushError> for FindError {
    fn from(err: PushError) -> Self {
        FindError::Allocation(err.source)
    }
}

/// Thread-safe stack of pending directories
#[derive(Debug, Default)]
pub struct DirStack {
    entries: Mutex<Vec<PathBuf>>,
}

impl DirStack {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the Vec consistent, so a poisoned lock
    // still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a directory on top of the stack.
    ///
    /// If the stack cannot grow it is left exactly as it was and the entry is
    /// returned inside the error.
    pub fn push(&self, entry: PathBuf) -> Result<(), PushError> {
        let mut entries = self.lock();
        if let Err(source) = entries.try_reserve(1) {
            return Err(PushError { entry, source });
        }
        entries.push(entry);
        Ok(())
    }

    /// Removes the most recently pushed directory, or returns `None` when the
    /// stack is empty.
    pub fn pop(&self) -> Option<PathBuf> {
        let mut entries = self.lock();
        let entry = entries.pop();
        if entries.is_empty() && entries.capacity() > 0 {
            // Give the backing storage back once fully drained
            entries.shrink_to_fit();
        }
        entry
    }

    /// Drops every remaining entry and returns how many there were.
    pub fn drain_and_release(&self) -> usize {
        let mut entries = self.lock();
        let released = entries.len();
        *entries = Vec::new();
        if released > 0 {
            trace!(released, "Released pending directories");
        }
        released
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

//! Thread identity and per-thread metadata.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sampling::sample::{CheckpointRef, StackTrace, TraceId};

/// Per-thread context handed to the sampler on every allocation event.
///
/// Implemented by the runtime's thread structure. The sampler only reads
/// identity, makes sure a checkpoint exists, and caches the last recorded
/// stack trace.
pub trait ThreadContext {
    /// Trace id of the thread, or 0 if it cannot be identified.
    fn thread_id(&self) -> TraceId;

    /// Check if the thread's metadata checkpoint has been recorded.
    fn has_checkpoint(&self) -> bool;

    /// Record the thread's metadata checkpoint.
    fn create_checkpoint(&mut self);

    /// Reference to the recorded checkpoint.
    fn checkpoint(&self) -> CheckpointRef;

    /// Remember a stack trace recorded for this thread.
    fn cache_stack_trace(&mut self, trace: StackTrace);
}

/// Source of checkpoint ids for [`ThreadState`].
static NEXT_CHECKPOINT: AtomicU64 = AtomicU64::new(1);

/// A ready-made thread context for embedders without their own.
#[derive(Debug, Clone)]
pub struct ThreadState {
    thread_id: TraceId,
    checkpoint: Option<CheckpointRef>,
    cached_stack_trace: Option<StackTrace>,
}

impl ThreadState {
    /// Create the context for an identified thread.
    pub fn new(thread_id: TraceId) -> Self {
        Self {
            thread_id,
            checkpoint: None,
            cached_stack_trace: None,
        }
    }

    /// Create a context the sampler will ignore.
    pub fn unidentified() -> Self {
        Self::new(0)
    }

    /// Last stack trace recorded on this thread.
    pub fn cached_stack_trace(&self) -> Option<StackTrace> {
        self.cached_stack_trace
    }
}

impl ThreadContext for ThreadState {
    fn thread_id(&self) -> TraceId {
        self.thread_id
    }

    fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    fn create_checkpoint(&mut self) {
        let id = NEXT_CHECKPOINT.fetch_add(1, Ordering::Relaxed);
        self.checkpoint = Some(CheckpointRef::new(id));
    }

    fn checkpoint(&self) -> CheckpointRef {
        self.checkpoint.unwrap_or_default()
    }

    fn cache_stack_trace(&mut self, trace: StackTrace) {
        self.cached_stack_trace = Some(trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_created_once() {
        let mut thread = ThreadState::new(3);
        assert!(!thread.has_checkpoint());

        thread.create_checkpoint();
        let checkpoint = thread.checkpoint();
        assert!(thread.has_checkpoint());
        assert_ne!(checkpoint.raw(), 0);
    }

    #[test]
    fn test_distinct_threads_get_distinct_checkpoints() {
        let mut a = ThreadState::new(1);
        let mut b = ThreadState::new(2);
        a.create_checkpoint();
        b.create_checkpoint();
        assert_ne!(a.checkpoint(), b.checkpoint());
    }
}

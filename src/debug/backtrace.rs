//! Backtrace-based stack trace recording.
//!
//! Captures unresolved frames on the allocation path and keeps one copy of
//! every distinct stack in a repository. Symbol resolution is deferred
//! until a trace is rendered for reporting.

use std::collections::HashMap;

use crate::api::thread::ThreadContext;
use crate::api::trace::StackTraceRecorder;
use crate::sampling::sample::{StackTrace, TraceId};
use crate::sync::mutex::Mutex;

/// A stored stack.
struct RecordedTrace {
    hash: u32,
    backtrace: ::backtrace::Backtrace,
}

#[derive(Default)]
struct Repository {
    /// Instruction pointers to trace id
    ids: HashMap<Vec<usize>, TraceId>,
    traces: HashMap<TraceId, RecordedTrace>,
    next_id: TraceId,
}

/// A [`StackTraceRecorder`] built on the `backtrace` crate.
pub struct BacktraceRecorder {
    repository: Mutex<Repository>,
}

impl BacktraceRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            repository: Mutex::new(Repository {
                next_id: 1,
                ..Repository::default()
            }),
        }
    }

    /// Number of distinct stacks recorded.
    pub fn len(&self) -> usize {
        self.repository.lock().traces.len()
    }

    /// Check if no stack has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of a recorded stack.
    pub fn hash_of(&self, id: TraceId) -> Option<u32> {
        self.repository.lock().traces.get(&id).map(|t| t.hash)
    }

    /// Render a recorded stack with symbols.
    pub fn resolve(&self, id: TraceId) -> Option<String> {
        let mut backtrace = self.repository.lock().traces.get(&id)?.backtrace.clone();
        backtrace.resolve();
        Some(format!("{:?}", backtrace))
    }
}

impl Default for BacktraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StackTraceRecorder for BacktraceRecorder {
    fn record(&self, _thread: &dyn ThreadContext, skip_frames: usize) -> Option<StackTrace> {
        let backtrace = ::backtrace::Backtrace::new_unresolved();
        let frames: Vec<usize> = backtrace
            .frames()
            .iter()
            .skip(skip_frames)
            .map(|frame| frame.ip() as usize)
            .collect();
        if frames.is_empty() {
            return None;
        }

        let hash = hash_frames(&frames);
        let mut repository = self.repository.lock();
        if let Some(&id) = repository.ids.get(&frames) {
            return Some(StackTrace { id, hash });
        }

        let id = repository.next_id;
        repository.next_id += 1;
        repository.ids.insert(frames, id);
        repository.traces.insert(id, RecordedTrace { hash, backtrace });
        Some(StackTrace { id, hash })
    }
}

/// Order-sensitive hash over instruction pointers.
fn hash_frames(frames: &[usize]) -> u32 {
    frames.iter().fold(0u32, |hash, &ip| {
        (hash << 2).wrapping_add((ip >> 2) as u32).wrapping_add(hash >> 30)
    })
}

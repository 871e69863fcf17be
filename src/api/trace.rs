//! Stack trace recording and the per-event stack trace policy.

use std::sync::atomic::{AtomicBool, Ordering};

use super::thread::ThreadContext;
use crate::sampling::sample::StackTrace;

/// Events the sampler can be asked to attach stack traces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// A retained allocation sample.
    OldObjectSample,
}

/// Decides whether stack traces are captured for an event kind.
pub trait EventPolicy {
    /// Check if stack traces are enabled for `kind`.
    fn stack_trace_enabled(&self, kind: EventKind) -> bool;
}

impl<F> EventPolicy for F
where
    F: Fn(EventKind) -> bool,
{
    fn stack_trace_enabled(&self, kind: EventKind) -> bool {
        self(kind)
    }
}

/// Runtime-switchable event settings.
#[derive(Debug, Default)]
pub struct EventSettings {
    old_object_stack_trace: AtomicBool,
}

impl EventSettings {
    /// Create settings with stack traces enabled or disabled.
    pub fn with_stack_traces(enabled: bool) -> Self {
        Self {
            old_object_stack_trace: AtomicBool::new(enabled),
        }
    }

    /// Enable or disable stack traces for `kind`.
    pub fn set_stack_trace(&self, kind: EventKind, enabled: bool) {
        match kind {
            EventKind::OldObjectSample => {
                self.old_object_stack_trace.store(enabled, Ordering::Relaxed)
            }
        }
    }
}

impl EventPolicy for EventSettings {
    fn stack_trace_enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::OldObjectSample => self.old_object_stack_trace.load(Ordering::Relaxed),
        }
    }
}

/// Records the current thread's stack.
pub trait StackTraceRecorder {
    /// Record the calling thread's stack, skipping `skip_frames` innermost
    /// frames.
    ///
    /// Returns `None` if no trace could be recorded.
    fn record(&self, thread: &dyn ThreadContext, skip_frames: usize) -> Option<StackTrace>;
}

/// Recorder for runtimes that do not capture stacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStackTraces;

impl StackTraceRecorder for NoStackTraces {
    fn record(&self, _thread: &dyn ThreadContext, _skip_frames: usize) -> Option<StackTrace> {
        None
    }
}

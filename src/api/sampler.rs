//! The object sampler.

use std::sync::Arc;

use crate::api::clock::{Clock, MonotonicClock};
use crate::api::config::{ConfigError, SamplerConfig};
use crate::api::gc::{LivenessOracle, ReferenceVisitor};
use crate::api::stats::{SamplerCounters, SamplerStats};
use crate::api::thread::ThreadContext;
use crate::api::trace::{EventKind, EventPolicy, EventSettings, NoStackTraces, StackTraceRecorder};
use crate::diagnostics::{self, Diagnostic, DiagnosticSink, OS001, OS002, OS101, OS102};
use crate::sampling::reservoir::{Admission, Reservoir, ScanSummary};
use crate::sampling::sample::{NewSample, ObjectRef, SampleHandle};
use crate::sync::try_lock::{TryLock, TryLockGuard};

/// Exclusive access to the reservoir, released on drop.
pub type ReservoirGuard<'a> = TryLockGuard<'a, Reservoir>;

/// What happened to an allocation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Stored in a free slot.
    Admitted(SampleHandle),
    /// Stored by evicting the smallest-span sample.
    Replaced(SampleHandle),
    /// Too light to displace any retained sample.
    Rejected,
    /// Another thread held the reservoir; the event was dropped.
    Contended,
    /// The thread has no id; the event was dropped.
    UnknownThread,
}

impl SampleOutcome {
    /// Check if the event is now a retained sample.
    pub fn is_sampled(&self) -> bool {
        matches!(self, SampleOutcome::Admitted(_) | SampleOutcome::Replaced(_))
    }
}

/// Thread-safe front of the sample reservoir.
///
/// Allocating threads call [`add`](Self::add) concurrently. Admission is
/// best effort: a thread that finds the reservoir busy drops its event
/// instead of waiting. The collector calls [`scan`](Self::scan) while all
/// allocating threads are halted.
///
/// # Example
///
/// ```rust
/// use objsampler::{ObjectRef, ObjectSampler, SamplerConfig, ThreadState};
///
/// let sampler = ObjectSampler::new(SamplerConfig::default()).unwrap();
/// let mut thread = ThreadState::new(1);
///
/// let outcome = sampler.add(ObjectRef::new(0x1000), 64, &mut thread);
/// assert!(outcome.is_sampled());
/// ```
pub struct ObjectSampler<C = MonotonicClock, R = NoStackTraces, P = EventSettings> {
    reservoir: TryLock<Reservoir>,
    config: SamplerConfig,
    clock: C,
    recorder: R,
    policy: P,
    counters: SamplerCounters,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl ObjectSampler {
    /// Create a sampler with the default clock, no stack traces and
    /// default event settings.
    pub fn new(config: SamplerConfig) -> Result<Self, ConfigError> {
        Self::with_collaborators(
            config,
            MonotonicClock::new(),
            NoStackTraces,
            EventSettings::default(),
        )
    }
}

impl<C, R, P> ObjectSampler<C, R, P>
where
    C: Clock,
    R: StackTraceRecorder,
    P: EventPolicy,
{
    /// Create a sampler with custom collaborators.
    pub fn with_collaborators(
        config: SamplerConfig,
        clock: C,
        recorder: R,
        policy: P,
    ) -> Result<Self, ConfigError> {
        let reservoir = Reservoir::new(&config, clock.now())?;
        let counters = SamplerCounters::default();

        Ok(Self {
            reservoir: TryLock::new(reservoir),
            config,
            clock,
            recorder,
            policy,
            counters,
            sink: None,
        })
    }

    /// Builder pattern: route diagnostics to `sink` instead of the global
    /// emitter.
    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Offer an allocation to the reservoir.
    ///
    /// Never blocks. Events from unidentified threads and events that
    /// find the reservoir locked are dropped.
    pub fn add<T>(&self, object: ObjectRef, allocated: usize, thread: &mut T) -> SampleOutcome
    where
        T: ThreadContext,
    {
        self.counters.events.increment();

        let thread_id = thread.thread_id();
        if thread_id == 0 {
            self.counters.unknown_thread.increment();
            self.report(&OS002);
            return SampleOutcome::UnknownThread;
        }

        if !thread.has_checkpoint() {
            thread.create_checkpoint();
            debug_assert!(thread.has_checkpoint(), "thread checkpoint not created");
        }

        let mut stack_trace = None;
        if self.policy.stack_trace_enabled(EventKind::OldObjectSample) {
            stack_trace = self.recorder.record(&*thread, self.config.stack_skip_frames);
            if let Some(trace) = stack_trace {
                thread.cache_stack_trace(trace);
            }
        }

        let allocation_time = self.clock.now();

        let Some(mut reservoir) = self.reservoir.try_lock() else {
            self.counters.contended.increment();
            self.report(&OS001);
            return SampleOutcome::Contended;
        };

        if reservoir.has_dead_samples() {
            let reclaimed = reservoir.reclaim_dead();
            self.counters.record_reclaimed(&reclaimed);
            self.report(&OS101);
        }

        let admission = reservoir.admit(NewSample {
            thread_id,
            thread_checkpoint: thread.checkpoint(),
            stack_trace,
            object,
            allocated,
            allocation_time,
        });

        self.counters.record_admission(&admission);
        self.counters.sample_count.set(reservoir.count() as u64);
        self.counters.total_allocated.set(reservoir.total_allocated());
        drop(reservoir);

        match admission {
            Admission::Admitted(handle) => SampleOutcome::Admitted(handle),
            Admission::Replaced { handle, .. } => SampleOutcome::Replaced(handle),
            Admission::Rejected { .. } => SampleOutcome::Rejected,
        }
    }

    /// Run a liveness sweep over every sample.
    ///
    /// Surviving references are passed to `visitor`, unreachable samples
    /// are marked dead and reclaimed by the next [`add`](Self::add).
    pub fn scan<L, V>(&mut self, oracle: &mut L, visitor: &mut V) -> ScanSummary
    where
        L: LivenessOracle + ?Sized,
        V: ReferenceVisitor + ?Sized,
    {
        let now = self.clock.now();
        let summary = self.reservoir.get_mut().scan(now, oracle, visitor);
        self.finish_scan(&summary);
        summary
    }

    /// Run a liveness sweep through a shared reference.
    ///
    /// For collectors that reach the sampler through an `Arc` and stop
    /// the world before sweeping.
    ///
    /// # Safety
    ///
    /// No other thread may be inside [`add`](Self::add) or hold a
    /// [`ReservoirGuard`] for the duration of the call, and none may
    /// start doing so.
    pub unsafe fn scan_unchecked<L, V>(&self, oracle: &mut L, visitor: &mut V) -> ScanSummary
    where
        L: LivenessOracle + ?Sized,
        V: ReferenceVisitor + ?Sized,
    {
        debug_assert!(!self.reservoir.is_locked(), "scan concurrent with admission");
        let now = self.clock.now();
        // SAFETY: The caller guarantees no concurrent access
        let reservoir = unsafe { &mut *self.reservoir.data_ptr() };
        let summary = reservoir.scan(now, oracle, visitor);
        self.finish_scan(&summary);
        summary
    }

    fn finish_scan(&self, summary: &ScanSummary) {
        self.counters.record_scan(summary);
        if summary.visited > 0 && summary.newly_dead == summary.visited {
            self.report(&OS102);
        }
    }

    /// Try to take the reservoir for inspection.
    ///
    /// Admissions that run into the held guard are dropped, so hold it
    /// briefly.
    pub fn try_lock(&self) -> Option<ReservoirGuard<'_>> {
        self.reservoir.try_lock()
    }

    /// Access the reservoir through an exclusive borrow.
    pub fn get_mut(&mut self) -> &mut Reservoir {
        self.reservoir.get_mut()
    }

    /// Consume the sampler and return its reservoir.
    pub fn into_reservoir(self) -> Reservoir {
        self.reservoir.into_inner()
    }

    /// Snapshot of the sampler counters.
    pub fn stats(&self) -> SamplerStats {
        self.counters.snapshot(self.config.capacity)
    }

    /// The sampler configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The stack trace recorder.
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// The event policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn report(&self, diag: &Diagnostic) {
        match &self.sink {
            Some(sink) => sink.emit(diag),
            None => diagnostics::emit(diag),
        }
    }
}

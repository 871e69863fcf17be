//! # objsampler
//!
//! Size-weighted old-object sampling for leak profilers in managed runtimes.
//!
//! The sampler watches the allocation stream and keeps a bounded set of
//! samples that approximates a size-weighted random sample of everything
//! allocated. Each sample holds a weak reference to its object; the
//! collector's liveness sweep marks samples whose objects died, and the
//! next admission reclaims them, merging their weight into a surviving
//! neighbour. What survives long enough is a leak candidate.
//!
//! ## Features
//!
//! - Fixed-capacity reservoir, no allocation after construction
//! - Non-blocking admission: a contended event is dropped, never waited on
//! - O(1) quick reject, O(log n) eviction
//! - Weak references checked only during the collector's sweep
//! - Lazy reclamation off the sweep path
//! - Optional backtrace-based stack trace recorder (`debug` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use objsampler::{NoRelocation, ObjectRef, ObjectSampler, SamplerConfig, ThreadState};
//!
//! let mut sampler = ObjectSampler::new(SamplerConfig::default()).unwrap();
//! let mut thread = ThreadState::new(1);
//!
//! // Allocation path
//! sampler.add(ObjectRef::new(0x1000), 256, &mut thread);
//! sampler.add(ObjectRef::new(0x2000), 64, &mut thread);
//!
//! // Collector, with mutators stopped
//! let mut is_alive = |object: ObjectRef| object.addr() == 0x1000;
//! sampler.scan(&mut is_alive, &mut NoRelocation);
//!
//! // Reporting
//! let reservoir = sampler.try_lock().unwrap();
//! for sample in reservoir.chain_iter() {
//!     println!("{:?} {} bytes dead={}", sample.object(), sample.allocated(), sample.is_dead());
//! }
//! ```

pub mod api;
pub mod diagnostics;

mod sampling;
mod sync;

#[cfg(feature = "debug")]
pub mod debug;

// Re-export public API at crate root for convenience
pub use api::clock::{Clock, ManualClock, MonotonicClock};
pub use api::config::{ConfigError, SamplerConfig, MAX_CAPACITY};
pub use api::gc::{LivenessOracle, NoRelocation, ReferenceVisitor};
pub use api::sampler::{ObjectSampler, ReservoirGuard, SampleOutcome};
pub use api::stats::SamplerStats;
pub use api::thread::{ThreadContext, ThreadState};
pub use api::trace::{EventKind, EventPolicy, EventSettings, NoStackTraces, StackTraceRecorder};

// Sample storage
pub use sampling::chain::ChainIter;
pub use sampling::reservoir::{Admission, Reclaimed, Reservoir, ScanSummary};
pub use sampling::sample::{
    CheckpointRef, NewSample, ObjectRef, Sample, SampleHandle, StackTrace, Ticks, TraceId,
};
pub use sync::try_lock::TryLockGuard;

// Diagnostics
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink};

#[cfg(feature = "debug")]
pub use debug::BacktraceRecorder;

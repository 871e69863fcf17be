//! The sample reservoir: admission, liveness sweep and lazy reclamation.
//!
//! The reservoir owns the sample chain and the priority queue, which index
//! the same set of samples. It is single-threaded; `ObjectSampler` puts it
//! behind a try-lock for concurrent allocating threads.
//!
//! ## Weighting
//!
//! Every allocation adds to `total_allocated`. The mass not yet accounted
//! for by retained spans, `total_allocated - total_span`, is the weight a
//! new sample is compared against. A full reservoir evicts its smallest
//! span only if that span does not exceed this candidate weight. An
//! admitted sample stores its own allocation size as its span; when a
//! sample dies its span is merged into its newer neighbour.

use crate::api::config::{ConfigError, SamplerConfig};
use crate::api::gc::{LivenessOracle, ReferenceVisitor};
use crate::diagnostics::{self, OS901};

use super::chain::{ChainIter, SampleChain};
use super::queue::SamplePriorityQueue;
use super::sample::{NewSample, Sample, SampleHandle, Ticks};

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored in a free slot.
    Admitted(SampleHandle),
    /// Stored in place of the smallest-span sample.
    Replaced {
        /// The new sample.
        handle: SampleHandle,
        /// Span of the evicted sample.
        evicted_span: usize,
    },
    /// The reservoir is full and its smallest span outweighs the candidate.
    Rejected {
        /// Unaccounted allocation mass at the time of the attempt.
        candidate_span: u64,
        /// Smallest retained span.
        min_span: usize,
    },
}

/// Summary of one liveness sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Samples whose object was checked.
    pub visited: usize,
    /// Samples found unreachable by this sweep.
    pub newly_dead: usize,
}

/// Summary of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reclaimed {
    /// Dead samples released.
    pub samples: usize,
    /// Span moved onto surviving neighbours.
    pub merged_span: usize,
    /// Span of dead samples with no newer neighbour.
    pub dropped_span: usize,
}

/// Fixed-capacity, size-weighted sample store.
pub struct Reservoir {
    chain: SampleChain,
    queue: SamplePriorityQueue,

    /// Every allocation size observed, sampled or not
    total_allocated: u64,

    /// Reserved
    threshold: usize,

    /// A sweep left dead samples behind
    dead_pending: bool,

    last_sweep: Ticks,
}

impl Reservoir {
    /// Create an empty reservoir.
    pub fn new(config: &SamplerConfig, now: Ticks) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            chain: SampleChain::new(config.capacity, config.preallocate),
            queue: SamplePriorityQueue::with_capacity(config.capacity),
            total_allocated: 0,
            threshold: config.threshold,
            dead_pending: false,
            last_sweep: now,
        })
    }

    /// Offer an allocation to the reservoir.
    ///
    /// Dead samples left by the last sweep are reclaimed first, since that
    /// changes the retained span total.
    pub fn admit(&mut self, sample: NewSample) -> Admission {
        debug_assert_ne!(sample.thread_id, 0, "unidentified thread");

        if self.dead_pending {
            self.reclaim_dead();
        }

        self.total_allocated = self.total_allocated.saturating_add(sample.allocated as u64);
        let candidate_span = self.total_allocated - self.queue.total();

        if self.is_full() {
            debug_assert_eq!(self.chain.count(), self.chain.capacity());
            let Some(min) = self.queue.peek() else {
                diagnostics::emit(&OS901);
                panic!("sample priority queue empty during eviction");
            };
            let min_span = self.chain.sample(min).span();
            if min_span as u64 > candidate_span {
                // Quick reject, will not fit.
                return Admission::Rejected {
                    candidate_span,
                    min_span,
                };
            }

            let evicted = self.queue.pop(self.chain.slots_mut());
            let evicted = self.chain.sample(evicted).handle();
            let handle = self.chain.reuse(evicted);
            self.store(handle, &sample);
            Admission::Replaced {
                handle,
                evicted_span: min_span,
            }
        } else {
            let Some(handle) = self.chain.acquire() else {
                diagnostics::emit(&OS901);
                panic!("sample chain full below capacity");
            };
            self.store(handle, &sample);
            Admission::Admitted(handle)
        }
    }

    fn store(&mut self, handle: SampleHandle, sample: &NewSample) {
        self.chain.sample_mut(handle.slot()).populate(sample);
        self.queue.push(self.chain.slots_mut(), handle.slot());
    }

    /// Check every sample's object against the liveness oracle.
    ///
    /// Surviving references are handed to `visitor`; unreachable samples
    /// are marked dead and left in place for the next admission to
    /// reclaim.
    pub fn scan<L, V>(&mut self, now: Ticks, oracle: &mut L, visitor: &mut V) -> ScanSummary
    where
        L: LivenessOracle + ?Sized,
        V: ReferenceVisitor + ?Sized,
    {
        let mut summary = ScanSummary::default();
        let mut cursor = self.chain.head_slot();

        while let Some(slot) = cursor {
            let sample = self.chain.sample_mut(slot);
            cursor = sample.next;
            if sample.is_dead() {
                continue;
            }

            summary.visited += 1;
            if oracle.is_alive(sample.object()) {
                visitor.visit(sample.object_mut());
            } else {
                sample.set_dead();
                self.dead_pending = true;
                summary.newly_dead += 1;
            }
        }

        self.last_sweep = now;
        summary
    }

    /// Release every dead sample, merging its span into its newer
    /// neighbour when there is one.
    pub fn reclaim_dead(&mut self) -> Reclaimed {
        let mut reclaimed = Reclaimed::default();
        let mut cursor = self.chain.head_slot();

        while let Some(slot) = cursor {
            let sample = self.chain.sample(slot);
            cursor = sample.next;
            if sample.is_dead() {
                self.remove_dead(slot, &mut reclaimed);
            }
        }

        self.dead_pending = false;
        reclaimed
    }

    fn remove_dead(&mut self, slot: u32, reclaimed: &mut Reclaimed) {
        let (span, prev, handle) = {
            let sample = self.chain.sample(slot);
            debug_assert!(sample.is_dead());
            (sample.span(), sample.prev, sample.handle())
        };

        // Newer neighbours were visited first, so `prev` is alive.
        match prev {
            Some(prev) => {
                self.queue.remove(self.chain.slots_mut(), prev);
                self.chain.sample_mut(prev).add_span(span);
                self.queue.push(self.chain.slots_mut(), prev);
                reclaimed.merged_span += span;
            }
            None => reclaimed.dropped_span += span,
        }

        self.queue.remove(self.chain.slots_mut(), slot);
        self.chain.release(handle);
        reclaimed.samples += 1;
    }

    /// Number of retained samples.
    pub fn count(&self) -> usize {
        self.queue.count()
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.chain.capacity()
    }

    /// Check if every slot holds a sample.
    pub fn is_full(&self) -> bool {
        self.queue.count() == self.chain.capacity()
    }

    /// Check if the reservoir holds no samples.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Sample at a position in the priority queue's internal order.
    ///
    /// The order is not stable across mutations.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn item_at(&self, index: usize) -> &Sample {
        self.chain.sample(self.queue.item_at(index))
    }

    /// Samples in priority queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.queue
            .items()
            .iter()
            .map(move |&slot| self.chain.sample(slot))
    }

    /// Samples from the most recent to the oldest.
    pub fn chain_iter(&self) -> ChainIter<'_> {
        self.chain.iter()
    }

    /// Resolve a handle, if its sample is still retained.
    pub fn get(&self, handle: SampleHandle) -> Option<&Sample> {
        self.chain.get(handle)
    }

    /// Sample with the smallest span.
    pub fn peek_min(&self) -> Option<&Sample> {
        self.queue.peek().map(|slot| self.chain.sample(slot))
    }

    /// Most recently admitted sample.
    pub fn last(&self) -> Option<&Sample> {
        self.chain.last().and_then(|handle| self.chain.get(handle))
    }

    /// Oldest retained sample.
    pub fn oldest(&self) -> Option<&Sample> {
        self.chain.oldest().and_then(|handle| self.chain.get(handle))
    }

    /// Last sample marked as processed by the reporting side.
    pub fn last_resolved(&self) -> Option<&Sample> {
        self.chain
            .last_resolved()
            .and_then(|handle| self.chain.get(handle))
    }

    /// Mark a sample as processed by the reporting side.
    pub fn set_last_resolved(&mut self, handle: Option<SampleHandle>) {
        self.chain.set_last_resolved(handle);
    }

    /// Sum of every allocation size observed.
    pub fn total_allocated(&self) -> u64 {
        self.total_allocated
    }

    /// Sum of retained spans.
    pub fn total_span(&self) -> u64 {
        self.queue.total()
    }

    /// Reserved admission threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Check if a sweep left dead samples awaiting reclamation.
    pub fn has_dead_samples(&self) -> bool {
        self.dead_pending
    }

    /// Time of the last liveness sweep.
    pub fn last_sweep(&self) -> Ticks {
        self.last_sweep
    }
}

//! Integration tests for objsampler.

use objsampler::{
    CollectingSink, EventKind, EventSettings, ManualClock, NoRelocation, NoStackTraces, ObjectRef,
    ObjectSampler, SampleOutcome, SamplerConfig, StackTrace, StackTraceRecorder, ThreadContext,
    ThreadState, Ticks,
};
use std::sync::Arc;
use std::thread;

fn sampler(capacity: usize) -> ObjectSampler {
    ObjectSampler::new(SamplerConfig::default().with_capacity(capacity)).unwrap()
}

fn spans(sampler: &ObjectSampler) -> Vec<usize> {
    let guard = sampler.try_lock().unwrap();
    let mut spans: Vec<usize> = guard.iter().map(|s| s.span()).collect();
    spans.sort_unstable();
    spans
}

// ============ ADMISSION ============

#[test]
fn test_admits_until_full() {
    let sampler = sampler(2);
    let mut thread = ThreadState::new(1);

    let first = sampler.add(ObjectRef::new(0x10), 10, &mut thread);
    let second = sampler.add(ObjectRef::new(0x20), 5, &mut thread);

    assert!(matches!(first, SampleOutcome::Admitted(_)));
    assert!(matches!(second, SampleOutcome::Admitted(_)));

    let guard = sampler.try_lock().unwrap();
    assert!(guard.is_full());
    assert_eq!(guard.total_allocated(), 15);
    assert_eq!(guard.total_span(), 15);
    assert_eq!(guard.last().unwrap().object(), ObjectRef::new(0x20));
    assert_eq!(guard.oldest().unwrap().object(), ObjectRef::new(0x10));
}

#[test]
fn test_light_allocation_rejected_when_full() {
    let sampler = sampler(2);
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(0x10), 10, &mut thread);
    sampler.add(ObjectRef::new(0x20), 5, &mut thread);

    let outcome = sampler.add(ObjectRef::new(0x30), 3, &mut thread);

    assert_eq!(outcome, SampleOutcome::Rejected);
    assert_eq!(spans(&sampler), vec![5, 10]);
    // A rejected event still counts toward the running total.
    assert_eq!(sampler.try_lock().unwrap().total_allocated(), 18);
}

#[test]
fn test_heavy_allocation_evicts_smallest() {
    let sampler = sampler(2);
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(0x10), 10, &mut thread);
    sampler.add(ObjectRef::new(0x20), 5, &mut thread);
    sampler.add(ObjectRef::new(0x30), 3, &mut thread);

    let outcome = sampler.add(ObjectRef::new(0x40), 20, &mut thread);

    assert!(matches!(outcome, SampleOutcome::Replaced(_)));
    assert_eq!(spans(&sampler), vec![10, 20]);

    let guard = sampler.try_lock().unwrap();
    assert_eq!(guard.count(), 2);
    assert_eq!(guard.total_allocated(), 38);
    assert!(guard.iter().all(|s| s.object() != ObjectRef::new(0x20)));
    assert_eq!(guard.last().unwrap().object(), ObjectRef::new(0x40));
}

#[test]
fn test_capacity_one() {
    let sampler = sampler(1);
    let mut thread = ThreadState::new(1);

    sampler.add(ObjectRef::new(1), 4, &mut thread);
    let outcome = sampler.add(ObjectRef::new(2), 4, &mut thread);

    // Candidate span is 8 - 4 = 4, equal to the minimum, so it evicts.
    assert!(matches!(outcome, SampleOutcome::Replaced(_)));
    let guard = sampler.try_lock().unwrap();
    assert_eq!(guard.count(), 1);
    assert_eq!(guard.last().unwrap().object(), ObjectRef::new(2));
}

#[test]
fn test_recycled_slot_holds_no_stale_fields() {
    struct FixedRecorder;

    impl StackTraceRecorder for FixedRecorder {
        fn record(&self, _thread: &dyn ThreadContext, _skip: usize) -> Option<StackTrace> {
            Some(StackTrace { id: 9, hash: 99 })
        }
    }

    let traced = EventSettings::with_stack_traces(true);
    let sampler = ObjectSampler::with_collaborators(
        SamplerConfig::default().with_capacity(1),
        ManualClock::new(Ticks(0)),
        FixedRecorder,
        traced,
    )
    .unwrap();
    let mut first_thread = ThreadState::new(1);
    let mut second_thread = ThreadState::new(2);

    let first = match sampler.add(ObjectRef::new(1), 8, &mut first_thread) {
        SampleOutcome::Admitted(handle) => handle,
        other => panic!("unexpected outcome {:?}", other),
    };

    sampler
        .policy()
        .set_stack_trace(EventKind::OldObjectSample, false);
    let second = match sampler.add(ObjectRef::new(2), 100, &mut second_thread) {
        SampleOutcome::Replaced(handle) => handle,
        other => panic!("unexpected outcome {:?}", other),
    };

    assert_eq!(first.raw_index(), second.raw_index());
    assert_ne!(first.raw_generation(), second.raw_generation());

    let guard = sampler.try_lock().unwrap();
    assert!(guard.get(first).is_none());
    let sample = guard.get(second).unwrap();
    assert_eq!(sample.thread_id(), 2);
    assert_eq!(sample.stack_trace(), None);
    assert_eq!(sample.span(), 100);
    assert!(!sample.is_dead());
}

// ============ LIVENESS SWEEPS ============

#[test]
fn test_dead_span_merges_into_newer_neighbour() {
    let mut sampler = sampler(3);
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(0xa), 10, &mut thread);
    sampler.add(ObjectRef::new(0xb), 5, &mut thread);
    sampler.add(ObjectRef::new(0xc), 7, &mut thread);

    let mut oracle = |object: ObjectRef| object != ObjectRef::new(0xb);
    let summary = sampler.scan(&mut oracle, &mut NoRelocation);
    assert_eq!(summary.visited, 3);
    assert_eq!(summary.newly_dead, 1);

    // Reclaim happens on the next admission.
    assert_eq!(sampler.get_mut().count(), 3);
    let outcome = sampler.add(ObjectRef::new(0xd), 1, &mut thread);
    assert!(matches!(outcome, SampleOutcome::Admitted(_)));

    let reservoir = sampler.get_mut();
    let objects: Vec<_> = reservoir.chain_iter().map(|s| (s.object().addr(), s.span())).collect();
    assert_eq!(objects, vec![(0xd, 1), (0xc, 12), (0xa, 10)]);
    assert_eq!(reservoir.total_span(), 23);
    assert_eq!(reservoir.total_allocated(), 23);
}

#[test]
fn test_most_recent_dead_sample_drops_span() {
    let mut sampler = sampler(2);
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(0xa), 10, &mut thread);
    sampler.add(ObjectRef::new(0xb), 5, &mut thread);

    let mut oracle = |object: ObjectRef| object == ObjectRef::new(0xa);
    sampler.scan(&mut oracle, &mut NoRelocation);
    sampler.add(ObjectRef::new(0xc), 1, &mut thread);

    let stats = sampler.stats();
    assert_eq!(stats.reclaimed, 1);
    assert_eq!(stats.dropped_span, 5);
    assert_eq!(stats.merged_span, 0);
    assert_eq!(spans(&sampler), vec![1, 10]);
}

#[test]
fn test_scan_relocates_survivors() {
    let mut sampler = sampler(4);
    let mut thread = ThreadState::new(1);
    for addr in [0x100, 0x200, 0x300] {
        sampler.add(ObjectRef::new(addr), 16, &mut thread);
    }

    let mut oracle = |object: ObjectRef| object.addr() != 0x200;
    let mut moved = 0;
    let mut visitor = |object: &mut ObjectRef| {
        *object = ObjectRef::new(object.addr() + 0x1000);
        moved += 1;
    };
    sampler.scan(&mut oracle, &mut visitor);
    assert_eq!(moved, 2);

    let reservoir = sampler.get_mut();
    let live: Vec<_> = reservoir
        .chain_iter()
        .filter(|s| !s.is_dead())
        .map(|s| s.object().addr())
        .collect();
    assert_eq!(live, vec![0x1300, 0x1100]);
}

#[test]
fn test_everything_dead_reports_warning() {
    let sink = Arc::new(CollectingSink::new());
    let mut sampler = sampler(4).with_diagnostic_sink(sink.clone());
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(1), 1, &mut thread);
    sampler.add(ObjectRef::new(2), 1, &mut thread);

    let mut oracle = |_: ObjectRef| false;
    sampler.scan(&mut oracle, &mut NoRelocation);

    assert_eq!(sink.count_code("OS102"), 1);
    assert!(!sink.has_errors());

    sampler.add(ObjectRef::new(3), 4, &mut thread);
    assert_eq!(sink.count_code("OS101"), 1);
    assert_eq!(spans(&sampler), vec![4]);
}

// ============ REPORTING SIDE ============

#[test]
fn test_last_resolved_moves_to_older_neighbour_on_eviction() {
    let mut sampler = sampler(2);
    let mut thread = ThreadState::new(1);
    sampler.add(ObjectRef::new(0xa), 10, &mut thread);
    let newer = match sampler.add(ObjectRef::new(0xb), 5, &mut thread) {
        SampleOutcome::Admitted(handle) => handle,
        other => panic!("unexpected outcome {:?}", other),
    };
    sampler.get_mut().set_last_resolved(Some(newer));

    sampler.add(ObjectRef::new(0xc), 20, &mut thread);

    let reservoir = sampler.get_mut();
    let resolved = reservoir.last_resolved().unwrap();
    assert_eq!(resolved.object(), ObjectRef::new(0xa));
}

#[test]
fn test_into_reservoir_keeps_samples() {
    let sampler = sampler(8);
    let mut thread = ThreadState::new(7);
    sampler.add(ObjectRef::new(1), 32, &mut thread);

    let reservoir = sampler.into_reservoir();
    assert_eq!(reservoir.count(), 1);
    assert_eq!(reservoir.item_at(0).thread_id(), 7);
}

// ============ MULTI-THREADED TESTS ============

#[test]
fn test_multithread_add_respects_capacity() {
    let sampler = Arc::new(sampler(16));
    let num_threads = 4;
    let events_per_thread = 500;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let sampler = sampler.clone();
            thread::spawn(move || {
                let mut context = ThreadState::new(thread_id + 1);
                for i in 0..events_per_thread {
                    let addr = ((thread_id as usize) << 20) | (i + 1);
                    let size = 8 + (i * 37) % 512;
                    sampler.add(ObjectRef::new(addr), size, &mut context);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let stats = sampler.stats();
    assert_eq!(stats.events, (num_threads as usize * events_per_thread) as u64);
    assert_eq!(
        stats.events,
        stats.admitted + stats.replaced + stats.rejected + stats.contended
    );
    assert_eq!(stats.unknown_thread, 0);

    let guard = sampler.try_lock().unwrap();
    assert!(guard.count() <= guard.capacity());
    assert!(guard.total_span() <= guard.total_allocated());
    assert_eq!(guard.chain_iter().count(), guard.count());
}

#[test]
fn test_inspection_guard_blocks_admission() {
    let sampler = Arc::new(sampler(4));
    let guard = sampler.try_lock().unwrap();

    let worker = {
        let sampler = sampler.clone();
        thread::spawn(move || {
            let mut context = ThreadState::new(1);
            sampler.add(ObjectRef::new(1), 64, &mut context)
        })
    };

    let outcome = worker.join().expect("Thread panicked");
    assert_eq!(outcome, SampleOutcome::Contended);
    assert!(guard.is_empty());
    drop(guard);

    assert_eq!(sampler.stats().contended, 1);
}

// ============ CONFIGURATION ============

#[test]
fn test_presets() {
    let minimal = ObjectSampler::with_collaborators(
        SamplerConfig::minimal(),
        ManualClock::new(Ticks::ZERO),
        NoStackTraces,
        EventSettings::default(),
    )
    .unwrap();
    assert_eq!(minimal.try_lock().unwrap().capacity(), 32);

    let wide = ObjectSampler::new(SamplerConfig::high_resolution()).unwrap();
    assert_eq!(wide.stats().capacity, 4096);
}

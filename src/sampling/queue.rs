//! Indexed min-heap of samples keyed by span.
//!
//! The queue orders slots owned by the chain; it never owns samples. Each
//! queued sample stores its heap position so arbitrary removal is
//! O(log n). The sum of all queued spans is kept incrementally.

use super::sample::Sample;

/// Binary min-heap over chain slot indices.
pub(crate) struct SamplePriorityQueue {
    /// Heap-ordered slot indices
    items: Vec<u32>,

    /// Sum of queued spans
    total: u64,
}

impl SamplePriorityQueue {
    /// Create a queue with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            total: 0,
        }
    }

    /// Insert a sample.
    pub fn push(&mut self, slots: &mut [Sample], slot: u32) {
        debug_assert!(
            slots[slot as usize].heap_index.is_none(),
            "sample is already queued"
        );

        let index = self.items.len();
        self.items.push(slot);
        slots[slot as usize].heap_index = Some(index as u32);
        self.total += slots[slot as usize].span() as u64;
        self.sift_up(slots, index);
    }

    /// Remove and return the sample with the smallest span.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Eviction only pops a full queue.
    pub fn pop(&mut self, slots: &mut [Sample]) -> u32 {
        let top = *self
            .items
            .first()
            .expect("pop from an empty sample priority queue");
        self.remove(slots, top);
        top
    }

    /// Slot with the smallest span, without removing it.
    pub fn peek(&self) -> Option<u32> {
        self.items.first().copied()
    }

    /// Remove an arbitrary queued sample.
    pub fn remove(&mut self, slots: &mut [Sample], slot: u32) {
        let index = slots[slot as usize]
            .heap_index
            .take()
            .expect("sample is not queued") as usize;
        debug_assert_eq!(self.items[index], slot);

        self.total -= slots[slot as usize].span() as u64;

        let last = self.items.len() - 1;
        if index != last {
            self.items.swap(index, last);
            self.items.pop();
            slots[self.items[index] as usize].heap_index = Some(index as u32);
            // The moved item may belong above or below its new position.
            let index = self.sift_up(slots, index);
            self.sift_down(slots, index);
        } else {
            self.items.pop();
        }
    }

    /// Slot at a position in heap order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn item_at(&self, index: usize) -> u32 {
        self.items[index]
    }

    /// Slots in heap order.
    pub fn items(&self) -> &[u32] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn span_at(&self, slots: &[Sample], index: usize) -> usize {
        slots[self.items[index] as usize].span()
    }

    fn swap(&mut self, slots: &mut [Sample], a: usize, b: usize) {
        self.items.swap(a, b);
        slots[self.items[a] as usize].heap_index = Some(a as u32);
        slots[self.items[b] as usize].heap_index = Some(b as u32);
    }

    fn sift_up(&mut self, slots: &mut [Sample], mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.span_at(slots, index) >= self.span_at(slots, parent) {
                break;
            }
            self.swap(slots, index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, slots: &mut [Sample], mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.span_at(slots, left) < self.span_at(slots, smallest) {
                smallest = left;
            }
            if right < len && self.span_at(slots, right) < self.span_at(slots, smallest) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(slots, index, smallest);
            index = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::sample::{CheckpointRef, NewSample, ObjectRef, Ticks};

    fn slots_with_spans(spans: &[usize]) -> Vec<Sample> {
        spans
            .iter()
            .enumerate()
            .map(|(i, &span)| {
                let mut sample = Sample::vacant(i as u32);
                sample.populate(&NewSample {
                    thread_id: 1,
                    thread_checkpoint: CheckpointRef::new(1),
                    stack_trace: None,
                    object: ObjectRef::new(0x100 + i),
                    allocated: span,
                    allocation_time: Ticks::ZERO,
                });
                sample
            })
            .collect()
    }

    fn assert_heap(queue: &SamplePriorityQueue, slots: &[Sample]) {
        for (i, &slot) in queue.items().iter().enumerate() {
            assert_eq!(slots[slot as usize].heap_index, Some(i as u32));
            if i > 0 {
                let parent = queue.items()[(i - 1) / 2];
                assert!(slots[parent as usize].span() <= slots[slot as usize].span());
            }
        }
        let sum: u64 = queue
            .items()
            .iter()
            .map(|&s| slots[s as usize].span() as u64)
            .sum();
        assert_eq!(queue.total(), sum);
    }

    #[test]
    fn test_pop_in_span_order() {
        let mut slots = slots_with_spans(&[40, 10, 30, 20, 50]);
        let mut queue = SamplePriorityQueue::with_capacity(5);
        for slot in 0..5 {
            queue.push(&mut slots, slot);
        }
        assert_heap(&queue, &slots);
        assert_eq!(queue.total(), 150);

        let order: Vec<usize> = (0..5)
            .map(|_| {
                let slot = queue.pop(&mut slots);
                slots[slot as usize].span()
            })
            .collect();
        assert_eq!(order, vec![10, 20, 30, 40, 50]);
        assert!(queue.is_empty());
        assert_eq!(queue.total(), 0);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut slots = slots_with_spans(&[8, 3, 5]);
        let mut queue = SamplePriorityQueue::with_capacity(3);
        for slot in 0..3 {
            queue.push(&mut slots, slot);
        }

        assert_eq!(queue.peek(), Some(1));
        assert_eq!(queue.count(), 3);
    }

    #[test]
    fn test_remove_arbitrary() {
        let mut slots = slots_with_spans(&[5, 9, 7, 12, 10, 8, 1]);
        let mut queue = SamplePriorityQueue::with_capacity(7);
        for slot in 0..7 {
            queue.push(&mut slots, slot);
        }

        queue.remove(&mut slots, 1);
        queue.remove(&mut slots, 6);
        assert_heap(&queue, &slots);
        assert_eq!(queue.count(), 5);
        assert_eq!(queue.total(), 5 + 7 + 12 + 10 + 8);
        assert!(slots[1].heap_index.is_none());
        assert_eq!(queue.peek(), Some(0));
    }

    #[test]
    fn test_reinsert_after_span_change() {
        let mut slots = slots_with_spans(&[2, 4, 6]);
        let mut queue = SamplePriorityQueue::with_capacity(3);
        for slot in 0..3 {
            queue.push(&mut slots, slot);
        }

        queue.remove(&mut slots, 0);
        slots[0].add_span(10);
        queue.push(&mut slots, 0);

        assert_heap(&queue, &slots);
        assert_eq!(queue.peek(), Some(1));
        assert_eq!(queue.total(), 12 + 4 + 6);
    }

    #[test]
    #[should_panic(expected = "empty sample priority queue")]
    fn test_pop_empty_panics() {
        let mut slots = slots_with_spans(&[]);
        let mut queue = SamplePriorityQueue::with_capacity(0);
        queue.pop(&mut slots);
    }
}

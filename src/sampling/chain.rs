//! Age-ordered sample chain with free-list recycling.
//!
//! The chain owns every sample slot. Slots live in a fixed-capacity arena
//! and are addressed by `u32` index; the active list is doubly linked
//! through those indices with the most recent sample at the head.

use super::sample::{Sample, SampleHandle};

/// Arena of sample slots plus the active and free lists.
pub(crate) struct SampleChain {
    /// Slot arena, never longer than `capacity`
    slots: Vec<Sample>,

    /// Maximum number of slots
    capacity: usize,

    /// Most recently linked sample
    head: Option<u32>,

    /// Oldest linked sample
    tail: Option<u32>,

    /// Released slot indices
    free_list: Vec<u32>,

    /// Number of linked samples
    count: usize,

    /// Marker for the reporting side
    last_resolved: Option<SampleHandle>,
}

impl SampleChain {
    /// Create a chain holding at most `capacity` samples.
    ///
    /// With `preallocate` every slot is created up-front, otherwise slots are
    /// created on first use.
    pub fn new(capacity: usize, preallocate: bool) -> Self {
        let slots = if preallocate {
            (0..capacity as u32).map(Sample::vacant).collect()
        } else {
            Vec::with_capacity(capacity)
        };

        // Hand out low indices first.
        let free_list = if preallocate {
            (0..capacity as u32).rev().collect()
        } else {
            Vec::new()
        };

        Self {
            slots,
            capacity,
            head: None,
            tail: None,
            free_list,
            count: 0,
            last_resolved: None,
        }
    }

    /// Link a free slot at the head.
    ///
    /// Returns `None` when every slot is active; the caller must evict first.
    pub fn acquire(&mut self) -> Option<SampleHandle> {
        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None if self.slots.len() < self.capacity => {
                let slot = self.slots.len() as u32;
                self.slots.push(Sample::vacant(slot));
                slot
            }
            None => return None,
        };

        self.link_front(slot);
        Some(self.slots[slot as usize].handle())
    }

    /// Recycle an active slot as the most recent sample.
    ///
    /// The slot must already be out of the priority queue.
    pub fn reuse(&mut self, handle: SampleHandle) -> SampleHandle {
        let slot = self.checked_slot(handle);
        self.unlink(slot);
        self.slots[slot as usize].reset();
        self.link_front(slot);
        self.slots[slot as usize].handle()
    }

    /// Return an active slot to the free pool.
    pub fn release(&mut self, handle: SampleHandle) {
        let slot = self.checked_slot(handle);
        self.unlink(slot);
        self.slots[slot as usize].reset();
        self.free_list.push(slot);
    }

    /// Resolve a handle, if it still addresses a live tenancy.
    pub fn get(&self, handle: SampleHandle) -> Option<&Sample> {
        self.slots
            .get(handle.slot() as usize)
            .filter(|sample| sample.linked && sample.handle() == handle)
    }

    pub fn sample(&self, slot: u32) -> &Sample {
        &self.slots[slot as usize]
    }

    pub fn sample_mut(&mut self, slot: u32) -> &mut Sample {
        &mut self.slots[slot as usize]
    }

    /// The whole slot arena, for the priority queue.
    pub fn slots_mut(&mut self) -> &mut [Sample] {
        &mut self.slots
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<SampleHandle> {
        self.head.map(|slot| self.slots[slot as usize].handle())
    }

    /// Oldest sample.
    pub fn oldest(&self) -> Option<SampleHandle> {
        self.tail.map(|slot| self.slots[slot as usize].handle())
    }

    pub fn head_slot(&self) -> Option<u32> {
        self.head
    }

    /// Last sample the reporting side has processed, if still linked.
    pub fn last_resolved(&self) -> Option<SampleHandle> {
        self.last_resolved.filter(|&handle| self.get(handle).is_some())
    }

    pub fn set_last_resolved(&mut self, handle: Option<SampleHandle>) {
        debug_assert!(
            handle.map_or(true, |h| self.get(h).is_some()),
            "last resolved sample must be linked"
        );
        self.last_resolved = handle;
    }

    /// Walk from the most recent sample to the oldest.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            slots: &self.slots,
            cursor: self.head,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots created so far.
    #[cfg(test)]
    pub fn allocated_slots(&self) -> usize {
        self.slots.len()
    }

    fn checked_slot(&self, handle: SampleHandle) -> u32 {
        assert!(
            self.get(handle).is_some(),
            "stale sample handle {:?}",
            handle
        );
        handle.slot()
    }

    fn link_front(&mut self, slot: u32) {
        let old_head = self.head;
        {
            let sample = &mut self.slots[slot as usize];
            sample.prev = None;
            sample.next = old_head;
            sample.linked = true;
        }

        match old_head {
            Some(head) => self.slots[head as usize].prev = Some(slot),
            None => self.tail = Some(slot),
        }

        self.head = Some(slot);
        self.count += 1;
    }

    fn unlink(&mut self, slot: u32) {
        let (prev, next, handle) = {
            let sample = &self.slots[slot as usize];
            (sample.prev, sample.next, sample.handle())
        };

        // Resolution moves on to the older neighbour.
        if self.last_resolved == Some(handle) {
            self.last_resolved = next.map(|n| self.slots[n as usize].handle());
        }

        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].prev = prev,
            None => self.tail = prev,
        }

        let sample = &mut self.slots[slot as usize];
        sample.prev = None;
        sample.next = None;
        sample.linked = false;
        self.count -= 1;
    }
}

/// Iterator over linked samples, most recent first.
pub struct ChainIter<'a> {
    slots: &'a [Sample],
    cursor: Option<u32>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = &self.slots[self.cursor? as usize];
        self.cursor = sample.next;
        Some(sample)
    }
}

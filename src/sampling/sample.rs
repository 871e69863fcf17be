//! Sample records and the handles that address them.

/// Identifier used for threads and stack traces. Zero means "none".
pub type TraceId = u64;

/// Monotonic timestamp in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    /// The zero timestamp.
    pub const ZERO: Ticks = Ticks(0);

    /// Get the raw tick count.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, saturating at zero.
    pub fn since(&self, earlier: Ticks) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Opaque weak reference to a heap object.
///
/// The reservoir never dereferences it. Whether the referent is still
/// reachable is only known to the liveness oracle during a sweep, and the
/// collector may rewrite the value through a reference visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectRef(usize);

impl ObjectRef {
    /// The cleared reference.
    pub const NULL: ObjectRef = ObjectRef(0);

    /// Wrap a raw object address.
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Wrap a pointer to a heap object.
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// Get the raw address.
    pub const fn addr(&self) -> usize {
        self.0
    }

    /// Check if the reference has been cleared.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Reference to thread metadata recorded by the checkpoint collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CheckpointRef(u64);

impl CheckpointRef {
    /// Wrap a raw checkpoint id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw checkpoint id.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// A stack trace recorded by the stack trace collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackTrace {
    /// Repository id of the trace.
    pub id: TraceId,
    /// Hash of the trace frames.
    pub hash: u32,
}

/// Handle to a sample slot.
///
/// Handles are plain references into the reservoir. A slot's generation is
/// bumped whenever it is recycled or released, so a handle taken before
/// that no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleHandle {
    slot: u32,
    generation: u32,
}

impl SampleHandle {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub(crate) const fn slot(&self) -> u32 {
        self.slot
    }

    /// Get the raw slot index (for debugging).
    pub fn raw_index(&self) -> u32 {
        self.slot
    }

    /// Get the generation (for debugging).
    pub fn raw_generation(&self) -> u32 {
        self.generation
    }
}

/// One retained allocation.
///
/// Samples are recycled in place. Only the reservoir mutates them; callers
/// get shared references for inspection.
#[derive(Debug, Clone)]
pub struct Sample {
    thread_id: TraceId,
    thread_checkpoint: CheckpointRef,
    stack_trace: Option<StackTrace>,
    span: usize,
    allocated: usize,
    allocation_time: Ticks,
    object: ObjectRef,
    dead: bool,

    /// Own slot index in the chain arena.
    pub(crate) slot: u32,
    /// Bumped on every reset.
    pub(crate) generation: u32,
    /// Whether the slot is on the active list.
    pub(crate) linked: bool,
    /// Newer neighbour.
    pub(crate) prev: Option<u32>,
    /// Older neighbour.
    pub(crate) next: Option<u32>,
    /// Position in the priority queue, if queued.
    pub(crate) heap_index: Option<u32>,
}

impl Sample {
    pub(crate) fn vacant(slot: u32) -> Self {
        Self {
            thread_id: 0,
            thread_checkpoint: CheckpointRef::default(),
            stack_trace: None,
            span: 0,
            allocated: 0,
            allocation_time: Ticks::ZERO,
            object: ObjectRef::NULL,
            dead: false,
            slot,
            generation: 0,
            linked: false,
            prev: None,
            next: None,
            heap_index: None,
        }
    }

    /// Handle addressing this sample's current tenancy.
    pub fn handle(&self) -> SampleHandle {
        SampleHandle::new(self.slot, self.generation)
    }

    /// Id of the allocating thread.
    pub fn thread_id(&self) -> TraceId {
        self.thread_id
    }

    /// Checkpoint holding the allocating thread's metadata.
    pub fn thread_checkpoint(&self) -> CheckpointRef {
        self.thread_checkpoint
    }

    /// Stack trace of the allocation site, if one was recorded.
    pub fn stack_trace(&self) -> Option<StackTrace> {
        self.stack_trace
    }

    /// Sampling weight. Starts at the allocation size and grows as dead
    /// neighbours are merged in.
    pub fn span(&self) -> usize {
        self.span
    }

    /// Size of the sampled allocation in bytes.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Time the allocation was observed.
    pub fn allocation_time(&self) -> Ticks {
        self.allocation_time
    }

    /// Weak reference to the sampled object.
    pub fn object(&self) -> ObjectRef {
        self.object
    }

    /// Whether the last sweep found the object unreachable.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub(crate) fn object_mut(&mut self) -> &mut ObjectRef {
        &mut self.object
    }

    pub(crate) fn set_dead(&mut self) {
        self.dead = true;
    }

    pub(crate) fn add_span(&mut self, span: usize) {
        self.span = self.span.saturating_add(span);
    }

    pub(crate) fn populate(&mut self, sample: &NewSample) {
        self.thread_id = sample.thread_id;
        self.thread_checkpoint = sample.thread_checkpoint;
        self.stack_trace = sample.stack_trace;
        self.span = sample.allocated;
        self.object = sample.object;
        self.allocated = sample.allocated;
        self.allocation_time = sample.allocation_time;
    }

    /// Clear the payload and start a new tenancy.
    ///
    /// Links and heap position are left to the owning containers.
    pub(crate) fn reset(&mut self) {
        self.thread_id = 0;
        self.thread_checkpoint = CheckpointRef::default();
        self.stack_trace = None;
        self.span = 0;
        self.allocated = 0;
        self.allocation_time = Ticks::ZERO;
        self.object = ObjectRef::NULL;
        self.dead = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// An allocation event that passed thread resolution, ready for admission.
#[derive(Debug, Clone, Copy)]
pub struct NewSample {
    /// Id of the allocating thread (never zero).
    pub thread_id: TraceId,
    /// Checkpoint holding the thread's metadata.
    pub thread_checkpoint: CheckpointRef,
    /// Stack trace of the allocation site.
    pub stack_trace: Option<StackTrace>,
    /// Weak reference to the allocated object.
    pub object: ObjectRef,
    /// Allocation size in bytes.
    pub allocated: usize,
    /// Time the allocation was observed.
    pub allocation_time: Ticks,
}

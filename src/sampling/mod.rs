//! Sample storage.
//!
//! The chain owns the sample slots, the priority queue orders the same
//! slots by span, and the reservoir keeps the two in step.

pub(crate) mod chain;
pub(crate) mod queue;
pub(crate) mod reservoir;
pub(crate) mod sample;

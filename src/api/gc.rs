//! Collector-side hooks used during a liveness sweep.
//!
//! Both traits are only called from `scan`, while the collector has
//! exclusive access to the sampler.

use crate::sampling::sample::ObjectRef;

/// Answers whether a sampled object is still reachable.
pub trait LivenessOracle {
    /// Check whether `object` survived the current collection.
    fn is_alive(&mut self, object: ObjectRef) -> bool;
}

/// Receives the weak reference of every surviving sample.
///
/// The collector may rewrite the reference, for example after moving the
/// object.
pub trait ReferenceVisitor {
    /// Visit a surviving reference.
    fn visit(&mut self, object: &mut ObjectRef);
}

impl<F> LivenessOracle for F
where
    F: FnMut(ObjectRef) -> bool,
{
    fn is_alive(&mut self, object: ObjectRef) -> bool {
        self(object)
    }
}

impl<F> ReferenceVisitor for F
where
    F: FnMut(&mut ObjectRef),
{
    fn visit(&mut self, object: &mut ObjectRef) {
        self(object)
    }
}

/// Visitor for collectors that never move objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelocation;

impl ReferenceVisitor for NoRelocation {
    fn visit(&mut self, _object: &mut ObjectRef) {}
}

//! Synchronization primitives.
//!
//! The admission path only ever uses the try-lock; mutexes guard the
//! off-path repositories.

pub(crate) mod atomics;
pub(crate) mod mutex;
pub(crate) mod try_lock;

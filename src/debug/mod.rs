//! Debug utilities for attributing samples to allocation sites.
//!
//! Only compiled when the `debug` feature is enabled.

pub(crate) mod backtrace;

pub use self::backtrace::BacktraceRecorder;

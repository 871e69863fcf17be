//! Public API for objsampler.
//!
//! This module contains the sampler front, its configuration, and the
//! collaborator traits the embedding runtime implements.

pub mod clock;
pub mod config;
pub mod gc;
pub mod sampler;
pub mod stats;
pub mod thread;
pub mod trace;

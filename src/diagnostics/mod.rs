//! Sampler diagnostics.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                          |
//! |-------|----------------------------------|
//! | OS0xx | Admission path                   |
//! | OS1xx | Liveness sweep and reclamation   |
//! | OS9xx | Internal errors                  |
//!
//! Admission-path diagnostics are trace level: they fire per dropped
//! event and only reach the `log` crate's trace level.

pub mod emit;
pub mod kind;

pub use emit::{emit, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};

pub use kind::{OS001, OS002, OS101, OS102, OS901};

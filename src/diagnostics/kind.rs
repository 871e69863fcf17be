//! Diagnostic kinds and core types.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - an internal invariant broke.
    Error,
    /// A warning - sampling quality is probably degraded.
    Warning,
    /// Informational context.
    Note,
    /// Hot-path event, only interesting when tracing.
    Trace,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
            DiagnosticKind::Trace => "trace",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `OS0xx` - Admission path
/// - `OS1xx` - Liveness sweep and reclamation
/// - `OS9xx` - Internal errors
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "OS001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self::new(DiagnosticKind::Error, code, message)
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self::new(DiagnosticKind::Warning, code, message)
    }

    /// Create a new trace diagnostic.
    pub const fn trace(code: &'static str, message: &'static str) -> Self {
        Self::new(DiagnosticKind::Trace, code, message)
    }

    const fn new(kind: DiagnosticKind, code: &'static str, message: &'static str) -> Self {
        Self {
            kind,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (OS0xx - Admission)
// =============================================================================

/// OS001: Sample dropped because another thread held the reservoir.
pub const OS001: Diagnostic = Diagnostic::trace(
    "OS001",
    "skipping old object sample due to lock contention"
);

/// OS002: Allocation from a thread without an id.
pub const OS002: Diagnostic = Diagnostic::trace(
    "OS002",
    "skipping old object sample from unidentified thread"
);

// =============================================================================
// Predefined diagnostics (OS1xx - Sweep)
// =============================================================================

/// OS101: Dead samples were reclaimed before admission.
pub const OS101: Diagnostic = Diagnostic::trace(
    "OS101",
    "reclaimed dead old object samples"
);

/// OS102: A sweep found every sample dead.
pub const OS102: Diagnostic = Diagnostic::warning(
    "OS102",
    "liveness sweep found no surviving samples"
).with_note("the reservoir will refill from new allocations only")
 .with_help("if this repeats, the sampled objects are short-lived and the leak candidates are elsewhere");

// =============================================================================
// Predefined diagnostics (OS9xx - Internal)
// =============================================================================

/// OS901: Internal sampler error.
pub const OS901: Diagnostic = Diagnostic::error(
    "OS901",
    "internal sampler error"
).with_note("this indicates a bug in objsampler")
 .with_help("please report this issue at the objsampler repository");

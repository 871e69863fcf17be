//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, logs, or custom sinks.

use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::{Diagnostic, DiagnosticKind};
use crate::sync::mutex::Mutex;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
///
/// With the `log` feature every diagnostic goes to the log crate, trace
/// diagnostics at trace level. Without it, errors and warnings go to stderr
/// in debug builds or with the `diagnostics` feature; trace diagnostics are
/// dropped.
pub fn emit(diag: &Diagnostic) {
    if is_suppressed() {
        return;
    }

    #[cfg(feature = "log")]
    {
        emit_to_log(diag);
    }

    #[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
    {
        if matches!(diag.kind, DiagnosticKind::Error | DiagnosticKind::Warning) {
            emit_to_stderr(diag);
        }
    }

    #[cfg(all(not(feature = "log"), not(any(debug_assertions, feature = "diagnostics"))))]
    {
        let _ = diag;
    }
}

/// Internal: emit to stderr.
#[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
fn emit_to_stderr(diag: &Diagnostic) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(
        stderr,
        "[objsampler][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }

    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }

    let _ = writeln!(stderr);
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
pub fn emit_to_log(diag: &Diagnostic) {
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {}", diag.code, diag.message);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {}", diag.code, diag.message);
        }
        DiagnosticKind::Note => {
            log::info!("[{}] {}", diag.code, diag.message);
        }
        DiagnosticKind::Trace => {
            log::trace!("[{}] {}", diag.code, diag.message);
            return;
        }
    }

    if let Some(note) = diag.note {
        log::info!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::info!("  help: {}", help);
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic. Must not fail or block for long.
    fn emit(&self, diag: &Diagnostic);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Count collected diagnostics with the given code.
    pub fn count_code(&self, code: &str) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }

    /// Check if any errors were collected.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic) {
        self.diagnostics.lock().push(diag.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{OS001, OS901};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&OS001);
        assert!(!sink.has_errors());

        sink.emit(&OS901);
        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.count_code("OS001"), 1);
        assert!(sink.has_errors());

        sink.clear();
        assert_eq!(sink.diagnostics().len(), 0);
    }

    /// Restores the previous suppression state on drop.
    struct SuppressionGuard(bool);

    impl SuppressionGuard {
        fn suppress() -> Self {
            let previous = is_suppressed();
            suppress_diagnostics(true);
            Self(previous)
        }
    }

    impl Drop for SuppressionGuard {
        fn drop(&mut self) {
            suppress_diagnostics(self.0);
        }
    }

    #[test]
    fn test_suppression_restores_previous_state() {
        let before = is_suppressed();
        {
            let _guard = SuppressionGuard::suppress();
            assert!(is_suppressed());
            emit(&OS901);
        }
        assert_eq!(is_suppressed(), before);
    }
}

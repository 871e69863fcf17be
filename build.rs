//! Build script for objsampler.
//!
//! Reports enabled features and points out combinations that are probably
//! not what the user wants.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Feature-specific diagnostics
    // =========================================================================

    // --- Debug Features ---
    if debug_enabled && is_release {
        emit_warning("'debug' feature enabled in release build!");
        emit_note("BacktraceRecorder walks the stack on every sampled allocation");
        emit_note("when stack traces are enabled for old object samples.");
    }

    // --- Diagnostics routing ---
    if log_enabled && diagnostics_enabled {
        emit_info("'log' and 'diagnostics' both enabled; diagnostics go to the log crate");
    }

    check_target_features();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[objsampler] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[objsampler]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[objsampler] warning: {}", msg);
}

// =============================================================================
// Environment and toolchain checks
// =============================================================================

fn check_target_features() {
    let has_atomics = env::var("CARGO_CFG_TARGET_HAS_ATOMIC")
        .map(|atomics| atomics.split(',').any(|width| width == "64"))
        .unwrap_or(true);

    if !has_atomics {
        emit_warning("target lacks 64-bit atomics");
        emit_note("sampler counters and the manual clock need AtomicU64");
    }
}

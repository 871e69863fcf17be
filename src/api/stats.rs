//! Sampler statistics.

use crate::sampling::reservoir::{Admission, Reclaimed, ScanSummary};
use crate::sync::atomics::{AtomicCounter, AtomicGauge};

/// Snapshot of sampler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Allocation events offered to the sampler.
    pub events: u64,

    /// Events dropped because the thread had no id.
    pub unknown_thread: u64,

    /// Events dropped because the reservoir was locked.
    pub contended: u64,

    /// Events rejected by the weight check.
    pub rejected: u64,

    /// Samples stored in a free slot.
    pub admitted: u64,

    /// Samples stored by evicting the smallest span.
    pub replaced: u64,

    /// Liveness sweeps performed.
    pub sweeps: u64,

    /// Samples found dead by sweeps.
    pub marked_dead: u64,

    /// Dead samples released by reclamation.
    pub reclaimed: u64,

    /// Span merged onto surviving neighbours.
    pub merged_span: u64,

    /// Span of dead samples with no surviving neighbour.
    pub dropped_span: u64,

    /// Samples currently retained.
    pub sample_count: usize,

    /// Maximum number of samples.
    pub capacity: usize,

    /// Sum of all allocation sizes observed.
    pub total_allocated: u64,
}

impl SamplerStats {
    /// Events that reached the weight check.
    pub fn considered(&self) -> u64 {
        self.rejected + self.admitted + self.replaced
    }

    /// Fraction of considered events that were kept.
    pub fn acceptance_ratio(&self) -> f64 {
        let considered = self.considered();
        if considered == 0 {
            return 0.0;
        }
        (self.admitted + self.replaced) as f64 / considered as f64
    }
}

impl std::fmt::Display for SamplerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sampler Statistics:")?;
        writeln!(f, "  Samples:         {} / {}", self.sample_count, self.capacity)?;
        writeln!(f, "  Total allocated: {}", format_bytes(self.total_allocated))?;
        writeln!(f, "  Events:          {}", self.events)?;
        writeln!(f, "  Admitted:        {}", self.admitted)?;
        writeln!(f, "  Replaced:        {}", self.replaced)?;
        writeln!(f, "  Rejected:        {}", self.rejected)?;
        writeln!(f, "  Contended:       {}", self.contended)?;
        writeln!(f, "  Unknown thread:  {}", self.unknown_thread)?;
        writeln!(f, "  Sweeps:          {}", self.sweeps)?;
        writeln!(f, "  Marked dead:     {}", self.marked_dead)?;
        writeln!(f, "  Reclaimed:       {}", self.reclaimed)?;
        writeln!(f, "  Merged span:     {}", format_bytes(self.merged_span))?;
        writeln!(f, "  Dropped span:    {}", format_bytes(self.dropped_span))?;
        Ok(())
    }
}

/// Render a byte count with a binary unit suffix.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Live counters behind [`SamplerStats`].
#[derive(Default)]
pub(crate) struct SamplerCounters {
    pub events: AtomicCounter,
    pub unknown_thread: AtomicCounter,
    pub contended: AtomicCounter,
    pub rejected: AtomicCounter,
    pub admitted: AtomicCounter,
    pub replaced: AtomicCounter,
    pub sweeps: AtomicCounter,
    pub marked_dead: AtomicCounter,
    pub reclaimed: AtomicCounter,
    pub merged_span: AtomicCounter,
    pub dropped_span: AtomicCounter,
    pub sample_count: AtomicGauge,
    pub total_allocated: AtomicGauge,
}

impl SamplerCounters {
    pub fn record_admission(&self, admission: &Admission) {
        match admission {
            Admission::Admitted(_) => self.admitted.increment(),
            Admission::Replaced { .. } => self.replaced.increment(),
            Admission::Rejected { .. } => self.rejected.increment(),
        }
    }

    pub fn record_reclaimed(&self, reclaimed: &Reclaimed) {
        self.reclaimed.add(reclaimed.samples as u64);
        self.merged_span.add(reclaimed.merged_span as u64);
        self.dropped_span.add(reclaimed.dropped_span as u64);
    }

    pub fn record_scan(&self, summary: &ScanSummary) {
        self.sweeps.increment();
        self.marked_dead.add(summary.newly_dead as u64);
    }

    pub fn snapshot(&self, capacity: usize) -> SamplerStats {
        SamplerStats {
            events: self.events.get(),
            unknown_thread: self.unknown_thread.get(),
            contended: self.contended.get(),
            rejected: self.rejected.get(),
            admitted: self.admitted.get(),
            replaced: self.replaced.get(),
            sweeps: self.sweeps.get(),
            marked_dead: self.marked_dead.get(),
            reclaimed: self.reclaimed.get(),
            merged_span: self.merged_span.get(),
            dropped_span: self.dropped_span.get(),
            sample_count: self.sample_count.get() as usize,
            capacity,
            total_allocated: self.total_allocated.get(),
        }
    }
}

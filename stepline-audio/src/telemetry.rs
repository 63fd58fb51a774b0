//! Transport thread timing stats.
//!
//! A fixed ring of pass durations, so recording never allocates on the
//! tick path.

use std::time::Duration;

const WINDOW: usize = 256;

/// Aggregated timings of one reporting window, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySummary {
    pub avg_us: u32,
    pub max_us: u32,
    pub p95_us: u32,
    /// Passes over budget since the transport started.
    pub overruns: u64,
    /// Scheduler ticks that had to be caught up in a later pass.
    pub late_ticks: u64,
}

pub struct TickTelemetry {
    durations_us: [u32; WINDOW],
    next: usize,
    filled: usize,
    max_us: u32,
    overruns: u64,
    late_ticks: u64,
}

impl Default for TickTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TickTelemetry {
    pub fn new() -> Self {
        Self {
            durations_us: [0; WINDOW],
            next: 0,
            filled: 0,
            max_us: 0,
            overruns: 0,
            late_ticks: 0,
        }
    }

    /// Record one driver pass against its budget.
    #[inline]
    pub fn record(&mut self, duration: Duration, budget: Duration) {
        let us = duration.as_micros().min(u32::MAX as u128) as u32;
        self.durations_us[self.next] = us;
        self.next = (self.next + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);
        self.max_us = self.max_us.max(us);
        if duration > budget {
            self.overruns += 1;
        }
    }

    /// A pass ran more than one scheduler tick.
    #[inline]
    pub fn record_catch_up(&mut self, extra_ticks: u64) {
        self.late_ticks += extra_ticks;
    }

    /// Summarise the window and reset its max. Counters stay cumulative.
    pub fn take_summary(&mut self) -> TelemetrySummary {
        if self.filled == 0 {
            return TelemetrySummary {
                late_ticks: self.late_ticks,
                ..Default::default()
            };
        }

        let samples = &self.durations_us[..self.filled];
        let sum: u64 = samples.iter().map(|&us| us as u64).sum();
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let p95_idx = (self.filled * 95 / 100).saturating_sub(1).min(self.filled - 1);

        let summary = TelemetrySummary {
            avg_us: (sum / self.filled as u64) as u32,
            max_us: self.max_us,
            p95_us: sorted[p95_idx],
            overruns: self.overruns,
            late_ticks: self.late_ticks,
        };
        self.max_us = 0;
        summary
    }
}

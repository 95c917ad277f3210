//! Periodic progress reporting.

use quartermaster_ledger::{Progress, QuantityLedger};
use quartermaster_types::{StagePhase, StagingRunId};

/// Emits one progress log line every `interval` ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReporter {
    interval: u64,
    last_report: Option<u64>,
}

impl ProgressReporter {
    /// A reporter that has not reported yet.
    pub const fn new(interval: u64) -> Self {
        Self {
            interval,
            last_report: None,
        }
    }

    /// Forget the last report so the next call reports immediately.
    pub const fn reset(&mut self) {
        self.last_report = None;
    }

    /// Report if the interval has elapsed since the last report.
    pub fn maybe_report(
        &mut self,
        run: StagingRunId,
        tick: u64,
        phase: StagePhase,
        ledger: &QuantityLedger,
    ) -> Option<Progress> {
        let due = self
            .last_report
            .is_none_or(|last| tick.saturating_sub(last) >= self.interval);
        if !due {
            return None;
        }
        self.last_report = Some(tick);
        let progress = ledger.progress();
        tracing::info!(
            run = %run,
            tick,
            phase = %phase,
            complete = progress.complete_types,
            total = progress.total_types,
            staged = progress.staged_units,
            required = progress.required_units,
            percent = %progress.percent(),
            "Staging progress"
        );
        Some(progress)
    }
}

//! Accumulates per-record outcomes into counters and an ordered result list.

use onboard_core::models::{OutcomeStatus, ProcessingOutcome, RunCounters};

/// Owned by one run and passed explicitly through the pipeline.
#[derive(Debug, Default)]
pub struct OutcomeAggregator {
    counters: RunCounters,
    outcomes: Vec<ProcessingOutcome>,
}

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record's terminal outcome. Call exactly once per record.
    pub fn record(&mut self, outcome: ProcessingOutcome) {
        match outcome.status {
            OutcomeStatus::Success => self.counters.success_count += 1,
            OutcomeStatus::Error => self.counters.failure_count += 1,
            OutcomeStatus::Warning => self.counters.warning_count += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Count a sub-step warning that has no outcome row of its own.
    pub fn note_warning(&mut self) {
        self.counters.warning_count += 1;
    }

    /// Point-in-time totals.
    pub fn summary(&self) -> RunCounters {
        self.counters
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn into_parts(self) -> (RunCounters, Vec<ProcessingOutcome>) {
        (self.counters, self.outcomes)
    }
}

//! Core formatting trait and the plain text implementation

use crate::{
    models::{AggregateResult, BatchSummary, TrialRecord},
    types::Direction,
    units::format_bytes,
};

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Line announcing the start of a direction
    fn format_header(&self, direction: Direction) -> String;

    /// One line per trial
    fn format_trial(&self, record: &TrialRecord) -> String;

    /// Extra per-trial line shown in verbose mode
    fn format_trial_detail(&self, record: &TrialRecord) -> Option<String>;

    /// Average and median line for a direction
    fn format_summary(&self, aggregate: &AggregateResult) -> String;

    /// Replacement for the summary when no trial succeeded
    fn format_direction_failure(&self, direction: Direction, reason: &str) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone, Default)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with per-trial detail lines
    pub verbose_mode: bool,
}

/// Plain text formatter; its lines are the report contract
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, direction: Direction) -> String {
        format!("Measuring {} speed...", direction)
    }

    fn format_trial(&self, record: &TrialRecord) -> String {
        match (&record.sample, &record.failure) {
            (Some(sample), _) => format!("Measurement {}: {:.2} Mbps", record.trial, sample.mbps()),
            (None, reason) => format!(
                "Measurement {}: failed ({})",
                record.trial,
                reason.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    fn format_trial_detail(&self, record: &TrialRecord) -> Option<String> {
        if !self.options.verbose_mode {
            return None;
        }
        Some(format!("  {}", batch_detail(&record.batch)))
    }

    fn format_summary(&self, aggregate: &AggregateResult) -> String {
        format!(
            "Average Speed: {:.2} Mbps, Median Speed: {:.2} Mbps",
            aggregate.average, aggregate.median
        )
    }

    fn format_direction_failure(&self, direction: Direction, reason: &str) -> String {
        format!("{} measurement failed: {}", direction.label(), reason)
    }
}

/// Counts from one batch, e.g. `3/4 transfers succeeded in 0.512s, 3 MiB counted`
pub(crate) fn batch_detail(batch: &BatchSummary) -> String {
    format!(
        "{}/{} transfers succeeded in {:.3}s, {} counted",
        batch.successful_tasks,
        batch.total_tasks,
        batch.elapsed.as_secs_f64(),
        format_bytes(batch.counted_bytes)
    )
}

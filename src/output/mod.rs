//! Output formatting and display system
//!
//! Turns trial records and aggregates into the report lines printed by the
//! `measure` command, with plain and colored variants.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter};
pub use formatter::{FormattingOptions, OutputFormatter, PlainFormatter};

use crate::{
    models::{DirectionReport, TrialRecord},
    types::Direction,
};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    /// Heading printed before a direction's trials
    pub fn display_header(&self, direction: Direction) -> String {
        self.formatter.format_header(direction)
    }

    /// Lines for one finished trial: the measurement, then any verbose detail
    pub fn display_trial(&self, record: &TrialRecord) -> String {
        let mut output = self.formatter.format_trial(record);
        if let Some(detail) = self.formatter.format_trial_detail(record) {
            output.push('\n');
            output.push_str(&detail);
        }
        output
    }

    /// Closing line for a direction: the summary, or why there is none
    pub fn display_outcome(&self, report: &DirectionReport) -> String {
        match (&report.aggregate, &report.failure) {
            (Some(aggregate), _) => self.formatter.format_summary(aggregate),
            (None, reason) => self.formatter.format_direction_failure(
                report.direction,
                reason.as_deref().unwrap_or("no successful trials"),
            ),
        }
    }
}

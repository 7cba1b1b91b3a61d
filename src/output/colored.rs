//! Colored formatter implementation with terminal color support
//!
//! Emits the same lines as the plain formatter with rates, headings and
//! failures highlighted through ANSI colors.

use super::formatter::{batch_detail, FormattingOptions, OutputFormatter, PlainFormatter};
use crate::{
    models::{AggregateResult, TrialRecord},
    types::Direction,
};
use colored::*;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub rate: Color,
    pub summary: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            rate: Color::Green,
            summary: Color::Cyan,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Create with a custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme,
        }
    }

    fn rate(&self, mbps: f64) -> ColoredString {
        format!("{:.2} Mbps", mbps).color(self.color_scheme.rate).bold()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, direction: Direction) -> String {
        self.plain_formatter
            .format_header(direction)
            .color(self.color_scheme.header)
            .bold()
            .to_string()
    }

    fn format_trial(&self, record: &TrialRecord) -> String {
        match (&record.sample, &record.failure) {
            (Some(sample), _) => format!("Measurement {}: {}", record.trial, self.rate(sample.mbps())),
            (None, reason) => format!(
                "Measurement {}: {}",
                record.trial,
                format!("failed ({})", reason.as_deref().unwrap_or("unknown error"))
                    .color(self.color_scheme.error)
            ),
        }
    }

    fn format_trial_detail(&self, record: &TrialRecord) -> Option<String> {
        if !self.options.verbose_mode {
            return None;
        }
        Some(format!("  {}", batch_detail(&record.batch).color(self.color_scheme.muted)))
    }

    fn format_summary(&self, aggregate: &AggregateResult) -> String {
        format!(
            "{} {}, {} {}",
            "Average Speed:".color(self.color_scheme.summary).bold(),
            self.rate(aggregate.average),
            "Median Speed:".color(self.color_scheme.summary).bold(),
            self.rate(aggregate.median)
        )
    }

    fn format_direction_failure(&self, direction: Direction, reason: &str) -> String {
        self.plain_formatter
            .format_direction_failure(direction, reason)
            .color(self.color_scheme.error)
            .bold()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchSummary, ThroughputSample};
    use std::time::Duration;

    fn formatter() -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions { enable_color: true, verbose_mode: true })
    }

    fn batch() -> BatchSummary {
        BatchSummary {
            successful_tasks: 4,
            total_tasks: 4,
            counted_bytes: 40 * 1024 * 1024,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_colored_lines_keep_the_plain_text() {
        let formatter = formatter();
        let record = TrialRecord::succeeded(3, ThroughputSample::new(320.0).unwrap(), batch());

        let line = formatter.format_trial(&record);
        assert!(line.starts_with("Measurement 3: "));
        assert!(line.contains("320.00 Mbps"));

        let failed = TrialRecord::failed(4, "all 4 download transfers failed".into(), batch());
        assert!(formatter.format_trial(&failed).contains("failed (all 4 download transfers failed)"));

        assert!(formatter.format_header(Direction::Upload).contains("Measuring upload speed..."));
        assert!(formatter
            .format_direction_failure(Direction::Download, "no samples")
            .contains("Download measurement failed: no samples"));
    }

    #[test]
    fn test_colored_summary_mentions_both_rates() {
        let aggregate = AggregateResult {
            average: 512.0,
            median: 498.25,
            min: 480.0,
            max: 560.0,
            std_dev: 20.0,
            sample_count: 3,
            failed_trials: 0,
        };
        let line = formatter().format_summary(&aggregate);
        assert!(line.contains("Average Speed:"));
        assert!(line.contains("512.00 Mbps"));
        assert!(line.contains("Median Speed:"));
        assert!(line.contains("498.25 Mbps"));
    }

    #[test]
    fn test_custom_scheme_detail_line() {
        let formatter = ColoredFormatter::with_color_scheme(
            FormattingOptions { enable_color: true, verbose_mode: true },
            ColorScheme { muted: Color::White, ..Default::default() },
        );
        let record = TrialRecord::succeeded(1, ThroughputSample::new(1.0).unwrap(), batch());
        let detail = formatter.format_trial_detail(&record).unwrap();
        assert!(detail.contains("4/4 transfers succeeded in 1.000s, 40 MiB counted"));
    }
}

//! Throughput calculation and statistics aggregation for transfer trials

use crate::{
    error::{AppError, Result},
    models::metrics::{AggregateResult, TrialSet},
    units::MEGABIT,
};
use std::cmp::Ordering;
use std::time::Duration;

/// Smallest elapsed time used as a divisor, guarding against a zero clock delta
const MIN_ELAPSED_SECS: f64 = 0.000_001;

/// Convert bytes moved over an elapsed time into Mbps (1024 x 1024 bits).
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> Result<f64> {
    let secs = elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);
    let mbps = (bytes as f64 * 8.0) / MEGABIT / secs;
    if !mbps.is_finite() {
        return Err(AppError::statistics(format!(
            "Throughput for {} bytes over {:?} is not finite",
            bytes, elapsed
        )));
    }
    Ok(mbps)
}

/// Arithmetic mean of the samples
pub fn average(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(AppError::statistics("Cannot average an empty sample set"));
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Median of the samples, computed on a sorted working copy
pub fn median(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(AppError::statistics("Cannot take the median of an empty sample set"));
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Population standard deviation
pub fn std_dev(samples: &[f64]) -> Result<f64> {
    let mean = average(samples)?;
    let variance = samples
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    Ok(variance.sqrt())
}

/// Smallest and largest sample
pub fn min_max(samples: &[f64]) -> Result<(f64, f64)> {
    let min = samples
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .ok_or_else(|| AppError::statistics("Cannot take the minimum of an empty sample set"))?;
    let max = samples
        .iter()
        .copied()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .ok_or_else(|| AppError::statistics("Cannot take the maximum of an empty sample set"))?;
    Ok((min, max))
}

/// Reduces finished trial sets into aggregate results
#[derive(Debug, Default, Clone)]
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Create a new statistics engine
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the successful samples of a trial set.
    ///
    /// Failed trials are counted but never averaged in. A set without any
    /// successful trial is an error.
    pub fn aggregate(&self, trials: &TrialSet) -> Result<AggregateResult> {
        let samples = trials.samples();
        let failed_trials = trials.failed_trials().count();

        if samples.is_empty() {
            let reason = trials
                .failed_trials()
                .last()
                .and_then(|r| r.failure.clone())
                .unwrap_or_else(|| "no trials were run".to_string());
            return Err(AppError::statistics(format!(
                "no successful {} trials out of {}: {}",
                trials.direction(),
                trials.len(),
                reason
            )));
        }

        let (min, max) = min_max(&samples)?;
        Ok(AggregateResult {
            average: average(&samples)?,
            median: median(&samples)?,
            min,
            max,
            std_dev: std_dev(&samples)?,
            sample_count: samples.len(),
            failed_trials,
        })
    }
}

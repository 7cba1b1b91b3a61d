//! Transfer outcomes, throughput samples and trial bookkeeping

use crate::error::{AppError, Result};
use crate::types::{ByteAccounting, Direction, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single transfer task within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Position of the task within its batch
    pub index: usize,

    /// Execution status
    pub status: TaskStatus,

    /// Bytes the task observed moving (response body or server receipt)
    pub bytes: u64,

    /// Wall-clock time of this task alone
    pub duration: Duration,

    /// HTTP status code, if a response arrived
    pub http_status: Option<u16>,

    /// Error message if the task failed
    pub error_message: Option<String>,
}

impl TaskOutcome {
    /// Create a successful task outcome
    pub fn success(index: usize, bytes: u64, http_status: u16, duration: Duration) -> Self {
        Self {
            index,
            status: TaskStatus::Success,
            bytes,
            duration,
            http_status: Some(http_status),
            error_message: None,
        }
    }

    /// Create a failed task outcome
    pub fn failed(index: usize, error_message: String, duration: Duration) -> Self {
        Self {
            index,
            status: TaskStatus::Failed,
            bytes: 0,
            duration,
            http_status: None,
            error_message: Some(error_message),
        }
    }

    /// Create a timed-out task outcome
    pub fn timeout(index: usize, deadline: Duration) -> Self {
        Self {
            index,
            status: TaskStatus::Timeout,
            bytes: 0,
            duration: deadline,
            http_status: None,
            error_message: Some(format!(
                "Request timed out after {}s",
                deadline.as_secs_f64()
            )),
        }
    }

    /// Check if this task completed successfully
    pub fn is_successful(&self) -> bool {
        matches!(self.status, TaskStatus::Success)
    }
}

/// Result of one concurrent batch, merged after the join barrier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Transfer direction
    pub direction: Direction,

    /// Number of tasks dispatched
    pub concurrency: u32,

    /// Configured bytes per transfer
    pub payload_size: u64,

    /// Per-task outcomes, ordered by task index
    pub tasks: Vec<TaskOutcome>,

    /// Time from dispatch of all tasks to completion of the last one
    pub elapsed: Duration,
}

impl BatchOutcome {
    /// Number of tasks that succeeded
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_successful()).count()
    }

    /// Number of tasks that failed or timed out
    pub fn failure_count(&self) -> usize {
        self.tasks.len() - self.success_count()
    }

    /// Sum of bytes observed by successful tasks
    pub fn observed_bytes(&self) -> u64 {
        self.tasks
            .iter()
            .filter(|t| t.is_successful())
            .map(|t| t.bytes)
            .sum()
    }

    /// Bytes used as the throughput numerator
    pub fn counted_bytes(&self, accounting: ByteAccounting) -> u64 {
        match accounting {
            ByteAccounting::Configured => self.success_count() as u64 * self.payload_size,
            ByteAccounting::Observed => self.observed_bytes(),
        }
    }

    /// First error message among failed tasks
    pub fn first_error(&self) -> Option<&str> {
        self.tasks
            .iter()
            .find_map(|t| t.error_message.as_deref())
    }

    /// Convert the batch into a throughput sample.
    ///
    /// A batch with no successful task is a hard failure rather than a zero
    /// rate.
    pub fn throughput(&self, accounting: ByteAccounting) -> Result<ThroughputSample> {
        if self.success_count() == 0 {
            return Err(AppError::transfer(format!(
                "all {} {} transfers failed: {}",
                self.tasks.len(),
                self.direction,
                self.first_error().unwrap_or("no transfers dispatched")
            )));
        }

        let mbps = crate::stats::throughput_mbps(self.counted_bytes(accounting), self.elapsed)?;
        ThroughputSample::new(mbps)
    }

    /// Compact summary kept with each trial record
    pub fn summary(&self, accounting: ByteAccounting) -> BatchSummary {
        BatchSummary {
            successful_tasks: self.success_count() as u32,
            total_tasks: self.tasks.len() as u32,
            counted_bytes: self.counted_bytes(accounting),
            elapsed: self.elapsed,
        }
    }
}

/// Counts retained from a batch after its throughput is derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub successful_tasks: u32,
    pub total_tasks: u32,
    pub counted_bytes: u64,
    pub elapsed: Duration,
}

/// A single throughput measurement in Mbps
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ThroughputSample(f64);

impl ThroughputSample {
    /// Create a sample, rejecting negative or non-finite rates
    pub fn new(mbps: f64) -> Result<Self> {
        if !mbps.is_finite() || mbps < 0.0 {
            return Err(AppError::statistics(format!("Invalid throughput sample: {}", mbps)));
        }
        Ok(Self(mbps))
    }

    /// Rate in Mbps
    pub fn mbps(&self) -> f64 {
        self.0
    }
}

/// One trial as recorded by the trial repeater
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based trial number
    pub trial: u32,

    /// Throughput, present when the trial succeeded
    pub sample: Option<ThroughputSample>,

    /// Reason the whole batch failed
    pub failure: Option<String>,

    /// Batch counts for this trial
    pub batch: BatchSummary,

    /// When the trial finished
    pub completed_at: DateTime<Utc>,
}

impl TrialRecord {
    /// Record a successful trial
    pub fn succeeded(trial: u32, sample: ThroughputSample, batch: BatchSummary) -> Self {
        Self {
            trial,
            sample: Some(sample),
            failure: None,
            batch,
            completed_at: Utc::now(),
        }
    }

    /// Record a failed trial
    pub fn failed(trial: u32, reason: String, batch: BatchSummary) -> Self {
        Self {
            trial,
            sample: None,
            failure: Some(reason),
            batch,
            completed_at: Utc::now(),
        }
    }

    /// Whether the trial produced a sample
    pub fn is_successful(&self) -> bool {
        self.sample.is_some()
    }
}

/// Append-only sequence of trials for one direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSet {
    direction: Direction,
    records: Vec<TrialRecord>,
}

impl TrialSet {
    /// Create an empty trial set
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            records: Vec::new(),
        }
    }

    /// Direction these trials measured
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Append a completed trial
    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    /// All recorded trials, in order
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Most recently appended trial
    pub fn last(&self) -> Option<&TrialRecord> {
        self.records.last()
    }

    /// Number of recorded trials
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no trial was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Throughput values of successful trials, in trial order
    pub fn samples(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.sample.map(|s| s.mbps()))
            .collect()
    }

    /// Trials flagged as failed
    pub fn failed_trials(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter().filter(|r| !r.is_successful())
    }
}

/// Summary statistics derived once from a finished trial set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub sample_count: usize,
    pub failed_trials: usize,
}

/// Everything reported for one direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionReport {
    pub direction: Direction,
    pub trials: TrialSet,
    pub aggregate: Option<AggregateResult>,
    pub failure: Option<String>,
}

impl DirectionReport {
    /// Whether the direction produced aggregate numbers
    pub fn is_successful(&self) -> bool {
        self.aggregate.is_some()
    }
}

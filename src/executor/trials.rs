//! Sequential trial execution for one direction

use super::BatchExecutor;
use crate::{
    error::AppError,
    logging::TransferLogger,
    models::{Config, TrialRecord, TrialSet},
    types::{ByteAccounting, Direction},
};
use std::sync::Arc;

/// Runs the configured number of batches one after another and records each
/// as a trial
pub struct TrialRepeater {
    executor: Arc<dyn BatchExecutor>,
    trial_count: u32,
    accounting: ByteAccounting,
    logger: TransferLogger,
}

impl TrialRepeater {
    /// Create a repeater using the trial count and byte accounting from `config`
    pub fn new(executor: Arc<dyn BatchExecutor>, config: &Config) -> Self {
        Self {
            executor,
            trial_count: config.trial_count,
            accounting: config.byte_accounting,
            logger: TransferLogger::new(config),
        }
    }

    /// Replace the logger
    pub fn with_logger(mut self, logger: TransferLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Number of trials per direction
    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    /// Run every trial for `direction`.
    ///
    /// Trials never overlap. `on_trial` sees each record as soon as it is
    /// appended, so callers can print progress while later trials run.
    pub async fn run<F>(&self, direction: Direction, mut on_trial: F) -> TrialSet
    where
        F: FnMut(&TrialRecord),
    {
        let mut trials = TrialSet::new(direction);

        for trial in 1..=self.trial_count {
            let batch = self.executor.run_batch(direction).await;
            let summary = batch.summary(self.accounting);

            let record = match batch.throughput(self.accounting) {
                Ok(sample) => {
                    self.logger.log_trial(direction, trial, Ok(sample.mbps())).await;
                    TrialRecord::succeeded(trial, sample, summary)
                }
                Err(error) => {
                    self.logger.log_trial(direction, trial, Err(&error)).await;
                    TrialRecord::failed(trial, failure_reason(&error), summary)
                }
            };

            on_trial(&record);
            trials.push(record);
        }

        trials
    }
}

fn failure_reason(error: &AppError) -> String {
    match error {
        AppError::Transfer(message) | AppError::Statistics(message) => message.clone(),
        other => other.to_string(),
    }
}

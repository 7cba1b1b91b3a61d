//! Transfer execution engine
//!
//! This module contains the concurrent side of a measurement:
//! - `TaskGroup`, which owns spawned transfer tasks and joins them together
//! - `TransferDriver`, which runs one gated batch of simultaneous transfers
//! - `TrialRepeater` (in `trials`), which runs batches back to back

pub mod trials;

pub use trials::TrialRepeater;

use crate::{
    client::{endpoint_url, Transport},
    error::{AppError, Result},
    logging::TransferLogger,
    models::{BatchOutcome, Config, TaskOutcome},
    types::{ByteAccounting, Direction},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use reqwest::Url;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Anything that can run one batch of transfers for a direction
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    /// Run one batch and return its merged outcome
    async fn run_batch(&self, direction: Direction) -> BatchOutcome;
}

/// Owns a set of spawned transfer tasks until they are joined.
///
/// Dropping the group without joining aborts whatever is still running.
#[derive(Default)]
pub struct TaskGroup {
    handles: Vec<(usize, JoinHandle<TaskOutcome>)>,
}

impl TaskGroup {
    /// Create an empty task group
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task that reports the outcome for slot `index`
    pub fn spawn<F>(&mut self, index: usize, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        self.handles.push((index, tokio::spawn(task)));
    }

    /// Number of spawned tasks
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing was spawned
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task and return the outcomes ordered by index.
    ///
    /// A task that panicked or was cancelled becomes a failed outcome.
    pub async fn join(mut self) -> Vec<TaskOutcome> {
        let (indices, handles): (Vec<usize>, Vec<_>) = std::mem::take(&mut self.handles).into_iter().unzip();
        let results = join_all(handles).await;

        let mut outcomes: Vec<TaskOutcome> = indices
            .into_iter()
            .zip(results)
            .map(|(index, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => TaskOutcome::failed(index, format!("Transfer task aborted: {}", e), Duration::ZERO),
            })
            .collect();

        outcomes.sort_by_key(|outcome| outcome.index);
        outcomes
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

/// Runs batches of simultaneous transfers against the payload server
pub struct TransferDriver {
    transport: Arc<dyn Transport>,
    download_url: Url,
    upload_url: Url,
    payload: Bytes,
    payload_size: u64,
    concurrency: u32,
    accounting: ByteAccounting,
    deadline: Duration,
    logger: TransferLogger,
}

impl TransferDriver {
    /// Create a driver for the given configuration and transport
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let base = config.server_url()?;
        let payload_len = usize::try_from(config.payload_size)
            .map_err(|_| AppError::config("Payload size does not fit in memory on this platform"))?;

        Ok(Self {
            transport,
            download_url: endpoint_url(&base, Direction::Download)?,
            upload_url: endpoint_url(&base, Direction::Upload)?,
            // Built once; every upload task shares the same buffer
            payload: Bytes::from(vec![0u8; payload_len]),
            payload_size: config.payload_size,
            concurrency: config.concurrency,
            accounting: config.byte_accounting,
            deadline: config.timeout(),
            logger: TransferLogger::new(config),
        })
    }

    /// Replace the logger
    pub fn with_logger(mut self, logger: TransferLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Override the per-task deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Endpoint used for a direction
    pub fn endpoint(&self, direction: Direction) -> &Url {
        match direction {
            Direction::Download => &self.download_url,
            Direction::Upload => &self.upload_url,
        }
    }

    /// Number of transfers per batch
    pub fn concurrency(&self) -> u32 {
        self.concurrency
    }

    /// Run one batch: release all transfers together, wait for all of them,
    /// and time the span between the two.
    pub async fn run_batch(&self, direction: Direction) -> BatchOutcome {
        let task_count = self.concurrency as usize;
        let url = self.endpoint(direction).clone();
        let gate = Arc::new(Barrier::new(task_count + 1));
        let mut group = TaskGroup::new();
        // Configured accounting credits S per success, so a success must have moved S
        let expected_bytes = (self.accounting == ByteAccounting::Configured).then_some(self.payload_size);

        for index in 0..task_count {
            let transport = Arc::clone(&self.transport);
            let url = url.clone();
            let payload = self.payload.clone();
            let gate = Arc::clone(&gate);
            let deadline = self.deadline;

            group.spawn(index, async move {
                gate.wait().await;
                run_transfer(index, direction, transport.as_ref(), &url, payload, deadline, expected_bytes).await
            });
        }

        // The clock starts once every task is parked at the gate
        gate.wait().await;
        let started = Instant::now();
        let tasks = group.join().await;
        let elapsed = started.elapsed();

        for outcome in &tasks {
            if outcome.is_successful() {
                self.logger.log_task_success(direction, url.as_str(), outcome).await;
            } else {
                self.logger.log_task_failure(direction, url.as_str(), outcome).await;
            }
        }

        let batch = BatchOutcome {
            direction,
            concurrency: self.concurrency,
            payload_size: self.payload_size,
            tasks,
            elapsed,
        };

        self.logger
            .log_batch_summary(direction, batch.success_count(), batch.tasks.len(), elapsed)
            .await;

        batch
    }
}

#[async_trait]
impl BatchExecutor for TransferDriver {
    async fn run_batch(&self, direction: Direction) -> BatchOutcome {
        TransferDriver::run_batch(self, direction).await
    }
}

/// One transfer under its own deadline; never panics on transport failure.
///
/// With `expected_bytes` set, a transfer that moved any other amount fails.
async fn run_transfer(
    index: usize,
    direction: Direction,
    transport: &dyn Transport,
    url: &Url,
    payload: Bytes,
    deadline: Duration,
    expected_bytes: Option<u64>,
) -> TaskOutcome {
    let started = Instant::now();
    let transfer = async {
        match direction {
            Direction::Download => transport.download(url).await,
            Direction::Upload => transport.upload(url, payload).await,
        }
    };

    match timeout(deadline, transfer).await {
        Ok(Ok(receipt)) => match expected_bytes {
            Some(expected) if receipt.bytes != expected => {
                let error = AppError::transfer(format!(
                    "{} moved {} of {} configured bytes",
                    url, receipt.bytes, expected
                ));
                TaskOutcome::failed(index, error.to_string(), started.elapsed())
            }
            _ => TaskOutcome::success(index, receipt.bytes, receipt.status, started.elapsed()),
        },
        Ok(Err(e)) => TaskOutcome::failed(index, e.to_string(), started.elapsed()),
        Err(_) => TaskOutcome::timeout(index, deadline),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeTransport;
    use super::*;
    use crate::client::HttpTransport;
    use crate::logging::{LogEntry, LogLevel, Logger};
    use crate::types::TaskStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MIB: u64 = 1024 * 1024;

    fn config(concurrency: u32) -> Config {
        Config {
            server_url: "http://127.0.0.1:9".to_string(),
            payload_size: MIB,
            concurrency,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_task_group_orders_outcomes_by_index() {
        let mut group = TaskGroup::new();
        for index in (0..4).rev() {
            group.spawn(index, async move {
                tokio::time::sleep(Duration::from_millis(10 * index as u64)).await;
                TaskOutcome::success(index, 1, 200, Duration::ZERO)
            });
        }
        assert_eq!(group.len(), 4);

        let outcomes = group.join().await;
        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    async fn exploding_transfer() -> TaskOutcome {
        panic!("transfer blew up")
    }

    #[tokio::test]
    async fn test_task_group_turns_panics_into_failures() {
        let mut group = TaskGroup::new();
        group.spawn(0, async { TaskOutcome::success(0, 1, 200, Duration::ZERO) });
        group.spawn(1, exploding_transfer());

        let outcomes = group.join().await;
        assert!(outcomes[0].is_successful());
        assert_eq!(outcomes[1].status, TaskStatus::Failed);
        assert!(outcomes[1].error_message.as_deref().unwrap().contains("aborted"));
    }

    #[tokio::test]
    async fn test_batch_runs_transfers_in_parallel() {
        let delay = Duration::from_millis(200);
        let transport = Arc::new(FakeTransport::new(delay, MIB));
        let driver = TransferDriver::new(&config(4), transport).unwrap();

        let batch = driver.run_batch(Direction::Download).await;

        assert_eq!(batch.success_count(), 4);
        assert!(batch.elapsed >= delay);
        // Four sequential transfers would need 800ms
        assert!(batch.elapsed < delay * 3, "batch took {:?}", batch.elapsed);
    }

    #[tokio::test]
    async fn test_partial_upload_failure_still_yields_a_sample() {
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(20), MIB).failing_on(&[2]));
        let driver = TransferDriver::new(&config(4), transport).unwrap();

        let batch = driver.run_batch(Direction::Upload).await;

        assert_eq!(batch.tasks.len(), 4);
        assert_eq!(batch.success_count(), 3);
        assert_eq!(batch.counted_bytes(ByteAccounting::Configured), 3 * MIB);
        assert_eq!(batch.observed_bytes(), 3 * MIB);
        assert!(batch.throughput(ByteAccounting::Configured).unwrap().mbps() > 0.0);
        assert_eq!(batch.first_error(), Some("Network error: connection reset by peer"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_logged() {
        let mut logger = Logger::new("XFER".to_string());
        logger.set_level(LogLevel::Warn);
        let captured = logger.capture();

        let transport = Arc::new(FakeTransport::new(Duration::from_millis(20), MIB).failing_on(&[1]));
        let driver = TransferDriver::new(&config(4), transport)
            .unwrap()
            .with_logger(TransferLogger::from_logger(logger));

        let batch = driver.run_batch(Direction::Upload).await;
        assert_eq!(batch.success_count(), 3);

        let entries = captured.lock().unwrap();
        let failures: Vec<&LogEntry> = entries.iter().filter(|e| e.message.contains(" failed: ")).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].level, LogLevel::Warn);
        assert!(failures[0].message.contains("connection reset by peer"));
        assert_eq!(failures[0].fields["status"], "Failed");

        // Partial batches are summarised at warning level too
        assert!(entries.iter().any(|e| e.message.starts_with("upload batch: 3/4 transfers succeeded")));
    }

    #[tokio::test]
    async fn test_short_download_fails_under_configured_accounting() {
        // Server hands out 256 KiB while the client expects 1 MiB
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(5), 256 * 1024));
        let driver = TransferDriver::new(&config(2), transport).unwrap();

        let batch = driver.run_batch(Direction::Download).await;

        assert_eq!(batch.success_count(), 0);
        let error = batch.throughput(ByteAccounting::Configured).unwrap_err();
        assert!(error.to_string().contains("moved 262144 of 1048576 configured bytes"));
    }

    #[tokio::test]
    async fn test_short_download_is_credited_under_observed_accounting() {
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(5), 256 * 1024));
        let config = Config { byte_accounting: ByteAccounting::Observed, ..config(2) };
        let driver = TransferDriver::new(&config, transport).unwrap();

        let batch = driver.run_batch(Direction::Download).await;

        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.counted_bytes(ByteAccounting::Observed), 512 * 1024);
    }

    #[tokio::test]
    async fn test_slow_transfers_hit_the_deadline() {
        let transport = Arc::new(FakeTransport::new(Duration::from_secs(5), MIB));
        let driver = TransferDriver::new(&config(2), transport)
            .unwrap()
            .with_deadline(Duration::from_millis(50));

        let batch = driver.run_batch(Direction::Download).await;

        assert_eq!(batch.success_count(), 0);
        assert!(batch.tasks.iter().all(|t| t.status == TaskStatus::Timeout));
        assert!(batch.elapsed < Duration::from_secs(1));
        assert!(batch.throughput(ByteAccounting::Configured).is_err());
    }

    #[tokio::test]
    async fn test_server_errors_count_as_failed_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = Config { server_url: server.uri(), ..config(2) };
        let transport = Arc::new(HttpTransport::new(&config).unwrap());
        let driver = TransferDriver::new(&config, transport).unwrap();

        let batch = driver.run_batch(Direction::Download).await;

        assert_eq!(batch.failure_count(), 2);
        let error = batch.throughput(ByteAccounting::Configured).unwrap_err();
        assert!(error.to_string().contains("all 2 download transfers failed"));
        assert!(error.to_string().contains("500"));
    }

    #[test]
    fn test_endpoints_resolve_from_base_url() {
        let config = Config { server_url: "http://10.0.0.2:8080/speed".into(), ..config(1) };
        let driver = TransferDriver::new(&config, Arc::new(FakeTransport::new(Duration::ZERO, 1))).unwrap();

        assert_eq!(driver.endpoint(Direction::Download).as_str(), "http://10.0.0.2:8080/speed/download");
        assert_eq!(driver.endpoint(Direction::Upload).as_str(), "http://10.0.0.2:8080/speed/upload");
        assert_eq!(driver.concurrency(), 1);
    }
}

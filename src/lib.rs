//! LAN Speed Tester
//!
//! Measures achievable HTTP throughput between a client and a payload server
//! on a local network. The client drives batches of concurrent synthetic
//! downloads and uploads, times each batch as one trial, and reduces the
//! trials to average and median throughput.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod server;
pub mod stats;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{AggregateResult, Config, DirectionReport, ServerConfig, ThroughputSample, TrialSet};
pub use client::{HttpTransport, Transport};
pub use executor::{BatchExecutor, TaskGroup, TransferDriver, TrialRepeater};
pub use stats::{average, median, throughput_mbps, StatisticsEngine};
pub use types::{ByteAccounting, Direction};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata from build.rs
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Version line including build metadata, shown in debug output
pub fn build_info() -> String {
    format!("{} v{} ({} {}, built {})", PKG_NAME, VERSION, GIT_COMMIT, TARGET_TRIPLE, BUILD_TIME)
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_PAYLOAD_SIZE: u64 = 10 * 1024 * 1024;
    pub const DEFAULT_TRIAL_COUNT: u32 = 5;
    pub const DEFAULT_CONCURRENCY: u32 = 4;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_TRIAL_COUNT: u32 = 100;
    pub const MAX_CONCURRENCY: u32 = 1024;
    pub const MAX_TIMEOUT_SECONDS: u64 = 300;
    pub const MAX_PAYLOAD_SIZE: u64 = 1024 * 1024 * 1024;
}

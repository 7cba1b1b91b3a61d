//! Data models and structures for the LAN speed tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, ServerConfig};
pub use metrics::{
    AggregateResult, BatchOutcome, BatchSummary, DirectionReport, TaskOutcome,
    ThroughputSample, TrialRecord, TrialSet,
};

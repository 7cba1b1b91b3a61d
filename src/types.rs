//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Direction of a synthetic transfer, seen from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client pulls the payload with `GET /download`
    Download,
    /// Client pushes the payload with `POST /upload`
    Upload,
}

impl Direction {
    /// Both directions, in report order
    pub const ALL: [Direction; 2] = [Direction::Download, Direction::Upload];

    /// Endpoint path on the payload server
    pub fn endpoint(&self) -> &'static str {
        match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        }
    }

    /// Capitalized label for report headings
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Download => "Download",
            Direction::Upload => "Upload",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "download" | "down" | "dl" => Ok(Direction::Download),
            "upload" | "up" | "ul" => Ok(Direction::Upload),
            other => Err(AppError::parse(format!(
                "Invalid direction '{}': expected download or upload",
                other
            ))),
        }
    }
}

/// Parse a direction list such as `download,upload` or `both`
pub fn parse_directions(value: &str) -> Result<Vec<Direction>> {
    let mut parsed = Vec::new();
    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if part.eq_ignore_ascii_case("both") || part.eq_ignore_ascii_case("all") {
            parsed.extend(Direction::ALL);
        } else {
            parsed.push(part.parse::<Direction>()?);
        }
    }
    if parsed.is_empty() {
        return Err(AppError::parse("Direction list cannot be empty"));
    }
    Ok(ordered_directions(parsed))
}

/// Drop repeats and put directions in report order: download first, then upload
pub fn ordered_directions<I>(directions: I) -> Vec<Direction>
where
    I: IntoIterator<Item = Direction>,
{
    let requested: Vec<Direction> = directions.into_iter().collect();
    Direction::ALL
        .into_iter()
        .filter(|direction| requested.contains(direction))
        .collect()
}

/// How bytes moved in a batch are counted for the throughput numerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteAccounting {
    /// Configured payload size times successful task count
    #[default]
    Configured,
    /// Sum of bytes each successful task actually observed
    Observed,
}

impl FromStr for ByteAccounting {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "configured" | "legacy" => Ok(ByteAccounting::Configured),
            "observed" | "measured" => Ok(ByteAccounting::Observed),
            other => Err(AppError::parse(format!(
                "Invalid byte accounting '{}': expected configured or observed",
                other
            ))),
        }
    }
}

impl fmt::Display for ByteAccounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteAccounting::Configured => f.write_str("configured"),
            ByteAccounting::Observed => f.write_str("observed"),
        }
    }
}

/// Transfer task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Transfer completed with a 2xx response
    Success,
    /// Transfer failed (connection error, non-2xx, short body)
    Failed,
    /// Transfer exceeded the per-request deadline
    Timeout,
}

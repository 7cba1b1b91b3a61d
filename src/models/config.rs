//! Configuration data model and validation

use crate::defaults::*;
use crate::types::{parse_directions, AppError, ByteAccounting, Direction, Result};
use crate::units::parse_size;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Client-side measurement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the payload server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Bytes moved by each transfer
    #[serde(default = "default_payload_size")]
    pub payload_size: u64,

    /// Number of sequential trials per direction
    #[serde(default = "default_trial_count")]
    pub trial_count: u32,

    /// Simultaneous transfers per trial
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Directions to measure, in report order
    #[serde(default = "default_directions")]
    pub directions: Vec<Direction>,

    /// How the throughput numerator counts bytes
    #[serde(default)]
    pub byte_accounting: ByteAccounting,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            payload_size: default_payload_size(),
            trial_count: default_trial_count(),
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout_secs(),
            directions: default_directions(),
            byte_accounting: ByteAccounting::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Parsed server base URL
    pub fn server_url(&self) -> Result<url::Url> {
        parse_server_url(&self.server_url)
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(AppError::config("Server URL cannot be empty"));
        }
        self.server_url()?;

        if self.trial_count == 0 {
            return Err(AppError::config("Trial count must be at least 1"));
        }

        if self.trial_count > MAX_TRIAL_COUNT {
            return Err(AppError::config(format!("Trial count cannot exceed {}", MAX_TRIAL_COUNT)));
        }

        if self.concurrency == 0 {
            return Err(AppError::config("Concurrency must be at least 1"));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(AppError::config(format!("Concurrency cannot exceed {}", MAX_CONCURRENCY)));
        }

        validate_payload_size(self.payload_size)?;

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                MAX_TIMEOUT_SECONDS
            )));
        }

        if self.directions.is_empty() {
            return Err(AppError::config("At least one direction must be measured"));
        }

        Ok(())
    }

    /// Merge values from an arbitrary key lookup (environment or test map)
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server_url) = lookup("SERVER_URL") {
            self.server_url = server_url.trim().to_string();
        }

        if let Some(payload_size) = lookup("PAYLOAD_SIZE") {
            self.payload_size = parse_size(&payload_size)
                .map_err(|e| AppError::config(format!("Invalid PAYLOAD_SIZE value '{}': {}", payload_size, e)))?;
        }

        if let Some(trial_count) = lookup("TRIAL_COUNT") {
            self.trial_count = trial_count.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TRIAL_COUNT value '{}': {}", trial_count, e)))?;
        }

        if let Some(concurrency) = lookup("CONCURRENCY") {
            self.concurrency = concurrency.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CONCURRENCY value '{}': {}", concurrency, e)))?;
        }

        if let Some(timeout) = lookup("TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Some(directions) = lookup("DIRECTIONS") {
            self.directions = parse_directions(&directions)
                .map_err(|e| AppError::config(format!("Invalid DIRECTIONS value '{}': {}", directions, e)))?;
        }

        if let Some(accounting) = lookup("BYTE_ACCOUNTING") {
            self.byte_accounting = accounting.parse()
                .map_err(|e| AppError::config(format!("Invalid BYTE_ACCOUNTING value '{}': {}", accounting, e)))?;
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Payload server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Size of the `/download` response body
    #[serde(default = "default_payload_size")]
    pub payload_size: u64,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            payload_size: default_payload_size(),
            verbose: false,
            debug: false,
            enable_color: default_enable_color(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Validate the server configuration
    pub fn validate(&self) -> Result<()> {
        validate_payload_size(self.payload_size)?;
        // usize conversion matters on 32-bit targets
        usize::try_from(self.payload_size)
            .map_err(|_| AppError::config("Payload size does not fit in memory on this platform"))?;
        Ok(())
    }

    /// Merge values from an arbitrary key lookup
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("BIND_ADDRESS") {
            self.bind_address = bind.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid BIND_ADDRESS value '{}': {}", bind, e)))?;
        }

        if let Some(port) = lookup("LISTEN_PORT") {
            self.port = port.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid LISTEN_PORT value '{}': {}", port, e)))?;
        }

        if let Some(payload_size) = lookup("PAYLOAD_SIZE") {
            self.payload_size = parse_size(&payload_size)
                .map_err(|e| AppError::config(format!("Invalid PAYLOAD_SIZE value '{}': {}", payload_size, e)))?;
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Parse and check a payload server base URL
pub fn parse_server_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| AppError::config(format!("Invalid server URL '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::config(format!(
                "Server URL must use http or https, got '{}'",
                other
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(AppError::config(format!("Server URL '{}' has no host", raw)));
    }

    Ok(parsed)
}

fn validate_payload_size(payload_size: u64) -> Result<()> {
    if payload_size == 0 {
        return Err(AppError::config("Payload size must be at least 1 byte"));
    }

    if payload_size > MAX_PAYLOAD_SIZE {
        return Err(AppError::config(format!(
            "Payload size cannot exceed {} bytes",
            MAX_PAYLOAD_SIZE
        )));
    }

    Ok(())
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_payload_size() -> u64 {
    DEFAULT_PAYLOAD_SIZE
}

fn default_trial_count() -> u32 {
    DEFAULT_TRIAL_COUNT
}

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_directions() -> Vec<Direction> {
    Direction::ALL.to_vec()
}

fn default_enable_color() -> bool {
    DEFAULT_ENABLE_COLOR
}

fn default_bind_address() -> IpAddr {
    DEFAULT_BIND_ADDRESS.parse().unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.payload_size, 10 * 1024 * 1024);
        assert_eq!(config.directions, vec![Direction::Download, Direction::Upload]);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_configuration_failures() {
        let cases = [
            Config { server_url: String::new(), ..Default::default() },
            Config { server_url: "ftp://host".into(), ..Default::default() },
            Config { concurrency: 0, ..Default::default() },
            Config { trial_count: 0, ..Default::default() },
            Config { payload_size: 0, ..Default::default() },
            Config { timeout_seconds: 0, ..Default::default() },
            Config { trial_count: 101, ..Default::default() },
            Config { directions: vec![], ..Default::default() },
        ];

        for config in cases {
            let error = config.validate().unwrap_err();
            assert!(matches!(error, AppError::Config(_)), "unexpected error: {}", error);
        }
    }

    #[test]
    fn test_merge_from_lookup() {
        let mut config = Config::default();
        config
            .merge_from_lookup(lookup_from(&[
                ("SERVER_URL", "http://10.0.0.2:9000"),
                ("PAYLOAD_SIZE", "1MiB"),
                ("TRIAL_COUNT", "3"),
                ("CONCURRENCY", "2"),
                ("DIRECTIONS", "upload"),
                ("BYTE_ACCOUNTING", "observed"),
                ("ENABLE_COLOR", "false"),
            ]))
            .unwrap();

        assert_eq!(config.server_url, "http://10.0.0.2:9000");
        assert_eq!(config.payload_size, 1024 * 1024);
        assert_eq!(config.trial_count, 3);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.directions, vec![Direction::Upload]);
        assert_eq!(config.byte_accounting, ByteAccounting::Observed);
        assert!(!config.enable_color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_rejects_malformed_values() {
        let mut config = Config::default();
        assert!(config.merge_from_lookup(lookup_from(&[("CONCURRENCY", "many")])).is_err());
        assert!(config.merge_from_lookup(lookup_from(&[("PAYLOAD_SIZE", "10TB")])).is_err());
    }

    #[test]
    fn test_server_config() {
        let mut config = ServerConfig::default();
        assert_eq!(config.socket_addr().port(), 8080);
        assert!(config.validate().is_ok());

        config
            .merge_from_lookup(lookup_from(&[
                ("BIND_ADDRESS", "127.0.0.1"),
                ("LISTEN_PORT", "9090"),
                ("PAYLOAD_SIZE", "1M"),
            ]))
            .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9090");
        assert_eq!(config.payload_size, 1024 * 1024);

        config.payload_size = 0;
        assert!(config.validate().is_err());
    }
}

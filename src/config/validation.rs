//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::{Config, ServerConfig},
    units::format_bytes,
};
use colored::Colorize;
use std::net::IpAddr;

/// Combined in-flight payload above which memory use gets flagged
const LARGE_FOOTPRINT_BYTES: u64 = 1024 * 1024 * 1024;

/// Payloads below this size mostly measure request overhead
const SMALL_PAYLOAD_BYTES: u64 = 64 * 1024;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks.
    ///
    /// Hard errors come from [`Config::validate`]; everything found here is a
    /// non-fatal warning.
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_server_url(config)?);
        warnings.extend(Self::validate_performance_settings(config));

        Ok(warnings)
    }

    /// Validate payload server settings
    pub fn validate_server(config: &ServerConfig) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        if config.bind_address.is_loopback() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Server bound to {}, other hosts on the LAN cannot reach it", config.bind_address)
            ));
        }

        if config.payload_size < SMALL_PAYLOAD_BYTES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Download payload of {} is small; results will be dominated by request overhead",
                    format_bytes(config.payload_size))
            ));
        }

        Ok(warnings)
    }

    /// Check the server URL for settings that skew LAN measurements
    fn validate_server_url(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let parsed = config.server_url()?;

        if parsed.scheme() == "https" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Server URL '{}' uses HTTPS; TLS overhead is included in the measured rate", config.server_url)
            ));
        }

        let is_local = match parsed.host() {
            Some(url::Host::Ipv4(ip)) => is_local_address(IpAddr::V4(ip)),
            Some(url::Host::Ipv6(ip)) => is_local_address(IpAddr::V6(ip)),
            Some(url::Host::Domain(domain)) => {
                domain == "localhost" || domain.ends_with(".local") || domain.ends_with(".lan")
            }
            None => false,
        };

        if !is_local {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Server URL '{}' does not look like a local network address", config.server_url)
            ));
        }

        if !parsed.path().is_empty() && parsed.path() != "/" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Endpoints will be resolved under path '{}'", parsed.path())
            ));
        }

        Ok(warnings)
    }

    /// Validate performance-related settings
    fn validate_performance_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.trial_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Trial count of {} may not provide a meaningful median (recommended: >= 3)", config.trial_count)
            ));
        }

        let cpus = num_cpus::get() as u32;
        if config.concurrency > cpus.saturating_mul(4) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Concurrency of {} is far above the {} available CPUs", config.concurrency, cpus)
            ));
        }

        let footprint = config.payload_size.saturating_mul(config.concurrency as u64);
        if footprint > LARGE_FOOTPRINT_BYTES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Each trial moves {} in flight ({} x {})",
                    format_bytes(footprint), config.concurrency, format_bytes(config.payload_size))
            ));
        }

        if config.payload_size < SMALL_PAYLOAD_BYTES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Payload of {} is small; results will be dominated by request overhead",
                    format_bytes(config.payload_size))
            ));
        }

        warnings
    }
}

fn is_local_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        // fc00::/7 unique local, fe80::/10 link local
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }

        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
            ValidationLevel::Error => tag.red(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

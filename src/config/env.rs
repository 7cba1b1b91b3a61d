//! Environment variable handling and .env file management

use crate::defaults::*;
use crate::error::{AppError, Result};
use crate::types::{parse_directions, ByteAccounting};
use crate::units::parse_size;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; values already set in the
    /// process environment win over the file
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        format!(
            r#"# LAN Speed Tester Configuration
#
# Values here are used as defaults and can be overridden by
# command-line arguments.

# --- measure ---

# Base URL of the payload server
# SERVER_URL={server_url}

# Bytes per transfer; accepts suffixes such as 512K, 10MiB, 1G
# PAYLOAD_SIZE=10MiB

# Sequential trials per direction (1-{max_trials})
# TRIAL_COUNT={trials}

# Simultaneous transfers per trial (1-{max_concurrency})
# CONCURRENCY={concurrency}

# Per-request deadline in seconds (1-{max_timeout})
# TIMEOUT_SECONDS={timeout}

# Directions to measure: download, upload or both
# DIRECTIONS=both

# Throughput numerator: configured (payload size x successful tasks)
# or observed (bytes actually moved)
# BYTE_ACCOUNTING=configured

# Enable colored output (true/false)
# ENABLE_COLOR=true

# --- serve ---

# Address and port the payload server binds
# BIND_ADDRESS={bind}
# LISTEN_PORT={port}
"#,
            server_url = DEFAULT_SERVER_URL,
            max_trials = MAX_TRIAL_COUNT,
            trials = DEFAULT_TRIAL_COUNT,
            max_concurrency = MAX_CONCURRENCY,
            concurrency = DEFAULT_CONCURRENCY,
            max_timeout = MAX_TIMEOUT_SECONDS,
            timeout = DEFAULT_TIMEOUT.as_secs(),
            bind = DEFAULT_BIND_ADDRESS,
            port = DEFAULT_PORT,
        )
    }

    /// Save example .env file to disk; an existing file is left alone
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(AppError::config(format!(
                "{} already exists; remove it or choose another --output path",
                path.display()
            )));
        }

        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SERVER_URL" => {
                crate::models::config::parse_server_url(value)?;
            }
            "PAYLOAD_SIZE" => {
                let size = parse_size(value)
                    .map_err(|e| AppError::config(format!("Invalid PAYLOAD_SIZE value '{}': {}", value, e)))?;
                if size == 0 || size > MAX_PAYLOAD_SIZE {
                    return Err(AppError::config(format!(
                        "PAYLOAD_SIZE must be between 1 and {} bytes, got: {}",
                        MAX_PAYLOAD_SIZE, size
                    )));
                }
            }
            "TRIAL_COUNT" => {
                let count: u32 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid TRIAL_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > MAX_TRIAL_COUNT {
                    return Err(AppError::config(format!(
                        "TRIAL_COUNT must be between 1 and {}, got: {}",
                        MAX_TRIAL_COUNT, count
                    )));
                }
            }
            "CONCURRENCY" => {
                let concurrency: u32 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid CONCURRENCY value '{}': {}", value, e)))?;
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(AppError::config(format!(
                        "CONCURRENCY must be between 1 and {}, got: {}",
                        MAX_CONCURRENCY, concurrency
                    )));
                }
            }
            "TIMEOUT_SECONDS" => {
                let timeout: u64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
                    return Err(AppError::config(format!(
                        "TIMEOUT_SECONDS must be between 1 and {}, got: {}",
                        MAX_TIMEOUT_SECONDS, timeout
                    )));
                }
            }
            "DIRECTIONS" => {
                parse_directions(value)
                    .map_err(|e| AppError::config(format!("Invalid DIRECTIONS value '{}': {}", value, e)))?;
            }
            "BYTE_ACCOUNTING" => {
                value.parse::<ByteAccounting>()
                    .map_err(|e| AppError::config(format!("Invalid BYTE_ACCOUNTING value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.trim().parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            "BIND_ADDRESS" => {
                value.trim().parse::<std::net::IpAddr>()
                    .map_err(|e| AppError::config(format!("Invalid BIND_ADDRESS value '{}': {}", value, e)))?;
            }
            "LISTEN_PORT" => {
                value.trim().parse::<u16>()
                    .map_err(|e| AppError::config(format!("Invalid LISTEN_PORT value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SERVER_URL", "Base URL of the payload server", "http://192.168.1.20:8080"),
            ("PAYLOAD_SIZE", "Bytes per transfer (suffixes K, M, G)", "10MiB"),
            ("TRIAL_COUNT", "Sequential trials per direction (1-100)", "5"),
            ("CONCURRENCY", "Simultaneous transfers per trial (1-1024)", "4"),
            ("TIMEOUT_SECONDS", "Per-request deadline in seconds (1-300)", "30"),
            ("DIRECTIONS", "Directions to measure", "download,upload"),
            ("BYTE_ACCOUNTING", "Throughput numerator (configured/observed)", "configured"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("BIND_ADDRESS", "Address the payload server binds", "0.0.0.0"),
            ("LISTEN_PORT", "Port the payload server listens on", "8080"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate lines of an env file without loading them
    pub fn check_env_content(content: &str) -> Vec<String> {
        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        warnings
    }

    /// Check if .env file exists and validate its contents
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        Ok(Some(Self::check_env_content(&content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_manager_create_example_content() {
        let content = EnvManager::create_example_env_content();

        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_example_content_passes_validation() {
        let uncommented: String = EnvManager::create_example_env_content()
            .lines()
            .map(|line| line.strip_prefix("# ").filter(|l| l.contains('=')).unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n");

        assert!(EnvManager::check_env_content(&uncommented).is_empty());
    }

    #[test]
    fn test_env_manager_save_example_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.env");
        EnvManager::save_example_env_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("LAN Speed Tester Configuration"));

        // Second write would clobber the first
        let error = EnvManager::save_example_env_file(&path).unwrap_err();
        assert!(error.to_string().contains("already exists"));
    }

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("SERVER_URL", "http://192.168.1.20:8080").is_ok());
        assert!(EnvManager::validate_env_var("PAYLOAD_SIZE", "10MiB").is_ok());
        assert!(EnvManager::validate_env_var("TRIAL_COUNT", "5").is_ok());
        assert!(EnvManager::validate_env_var("CONCURRENCY", "1024").is_ok());
        assert!(EnvManager::validate_env_var("DIRECTIONS", "upload").is_ok());
        assert!(EnvManager::validate_env_var("BYTE_ACCOUNTING", "observed").is_ok());
        assert!(EnvManager::validate_env_var("LISTEN_PORT", "9000").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("SERVER_URL", "not-a-url").is_err());
        assert!(EnvManager::validate_env_var("PAYLOAD_SIZE", "0").is_err());
        assert!(EnvManager::validate_env_var("PAYLOAD_SIZE", "2G").is_err());
        assert!(EnvManager::validate_env_var("TRIAL_COUNT", "0").is_err());
        assert!(EnvManager::validate_env_var("TRIAL_COUNT", "101").is_err());
        assert!(EnvManager::validate_env_var("CONCURRENCY", "0").is_err());
        assert!(EnvManager::validate_env_var("TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("DIRECTIONS", "sideways").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
        assert!(EnvManager::validate_env_var("BIND_ADDRESS", "localhost").is_err());
        assert!(EnvManager::validate_env_var("LISTEN_PORT", "70000").is_err());
    }

    #[test]
    fn test_check_env_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "# comment\nTRIAL_COUNT=3\nCONCURRENCY=zero\n").unwrap();

        let warnings = EnvManager::check_env_file(temp_file.path()).unwrap().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("CONCURRENCY=zero"));

        let missing = temp_file.path().with_extension("missing");
        assert!(EnvManager::check_env_file(&missing).unwrap().is_none());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("SERVER_URL"));
        assert!(help.contains("Configuration Priority"));
        assert!(help.contains("Command-line arguments"));
    }
}

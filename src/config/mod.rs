//! Configuration management module

pub mod parser;
pub mod validation;
pub mod env;

// Re-export main functionality
pub use parser::{ConfigParser, load_config, load_server_config, display_config_summary, display_server_summary};
pub use validation::{ConfigValidator, ValidationLevel, ValidationWarning, validate_config};
pub use env::EnvManager;

// Re-export from models for convenience
pub use crate::models::{Config, ServerConfig};

// Additional comprehensive tests in separate module
#[cfg(test)]
mod comprehensive_tests;

//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{GlobalArgs, MeasureArgs, ServeArgs},
    config::env::EnvManager,
    error::Result,
    models::{Config, ServerConfig},
    types::ordered_directions,
    units::format_bytes,
};

/// Configuration parser that layers defaults, .env, environment and CLI flags
pub struct ConfigParser {
    global: GlobalArgs,
    load_env_file: bool,
}

impl ConfigParser {
    /// Create a new configuration parser with the global CLI flags
    pub fn new(global: GlobalArgs) -> Self {
        Self {
            global,
            load_env_file: true,
        }
    }

    /// Skip loading `.env` from the working directory
    pub fn without_env_file(mut self) -> Self {
        self.load_env_file = false;
        self
    }

    /// Build the measurement client configuration
    pub fn parse_measure(&self, args: &MeasureArgs) -> Result<Config> {
        self.parse_measure_with(args, |key| std::env::var(key).ok())
    }

    /// Build the client configuration from an explicit variable lookup
    pub fn parse_measure_with<F>(&self, args: &MeasureArgs, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_lookup(lookup)?;
        self.apply_measure_overrides(&mut config, args);
        config.validate()?;

        Ok(config)
    }

    /// Build the payload server configuration
    pub fn parse_serve(&self, args: &ServeArgs) -> Result<ServerConfig> {
        self.parse_serve_with(args, |key| std::env::var(key).ok())
    }

    /// Build the server configuration from an explicit variable lookup
    pub fn parse_serve_with<F>(&self, args: &ServeArgs, lookup: F) -> Result<ServerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        self.load_env_file()?;
        config.merge_from_lookup(lookup)?;
        self.apply_serve_overrides(&mut config, args);
        config.validate()?;

        Ok(config)
    }

    fn load_env_file(&self) -> Result<()> {
        if self.load_env_file {
            EnvManager::load_env_file(self.global.debug)?;
        }
        Ok(())
    }

    fn apply_measure_overrides(&self, config: &mut Config, args: &MeasureArgs) {
        if let Some(ref server) = args.server {
            config.server_url = server.trim().to_string();
        }
        if let Some(payload_size) = args.payload_size {
            config.payload_size = payload_size;
        }
        if let Some(trials) = args.trials {
            config.trial_count = trials;
        }
        if let Some(concurrency) = args.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            config.timeout_seconds = timeout;
        }
        if !args.directions.is_empty() {
            config.directions = ordered_directions(args.directions.iter().copied());
        }
        if let Some(accounting) = args.byte_accounting {
            config.byte_accounting = accounting;
        }

        if self.global.no_color {
            config.enable_color = false;
        }
        config.verbose = self.global.verbose;
        config.debug = self.global.debug;
    }

    fn apply_serve_overrides(&self, config: &mut ServerConfig, args: &ServeArgs) {
        if let Some(bind) = args.bind {
            config.bind_address = bind;
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(payload_size) = args.payload_size {
            config.payload_size = payload_size;
        }

        if self.global.no_color {
            config.enable_color = false;
        }
        config.verbose = self.global.verbose;
        config.debug = self.global.debug;
    }
}

/// Convenience function to load the client configuration
pub fn load_config(global: &GlobalArgs, args: &MeasureArgs) -> Result<Config> {
    ConfigParser::new(global.clone()).parse_measure(args)
}

/// Convenience function to load the server configuration
pub fn load_server_config(global: &GlobalArgs, args: &ServeArgs) -> Result<ServerConfig> {
    ConfigParser::new(global.clone()).parse_serve(args)
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let directions: Vec<String> = config.directions.iter().map(|d| d.to_string()).collect();
    let mut summary = Vec::new();

    summary.push(format!("Server URL: {}", config.server_url));
    summary.push(format!("Payload Size: {}", format_bytes(config.payload_size)));
    summary.push(format!("Trials: {}", config.trial_count));
    summary.push(format!("Concurrency: {}", config.concurrency));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Directions: {}", directions.join(", ")));
    summary.push(format!("Byte Accounting: {}", config.byte_accounting));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

/// Display server configuration summary
pub fn display_server_summary(config: &ServerConfig) -> String {
    [
        format!("Listen Address: {}", config.socket_addr()),
        format!("Payload Size: {}", format_bytes(config.payload_size)),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ]
    .join("\n")
}

//! Main application orchestration and execution

use crate::{
    cli::{Cli, Command, EnvAction, GlobalArgs, MeasureArgs, ServeArgs},
    client::{HttpTransport, Transport},
    config::{
        display_config_summary, display_server_summary, load_config, load_server_config,
        validate_config, ConfigValidator, EnvManager, ValidationWarning,
    },
    error::{AppError, Result},
    executor::{TransferDriver, TrialRepeater},
    logging::{ErrorEventLogger, Logger, LoggerFactory},
    models::{Config, DirectionReport},
    output::{OutputCoordinator, OutputFormatterFactory},
    server,
    stats::StatisticsEngine,
    types::Direction,
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected subcommand
    pub async fn run(self) -> Result<()> {
        match &self.cli.command {
            Command::Serve(args) => run_serve(&self.cli.global, args).await,
            Command::Measure(args) => run_measure(&self.cli.global, args).await,
            Command::Env(args) => run_env(&args.action),
        }
    }
}

async fn run_serve(global: &GlobalArgs, args: &ServeArgs) -> Result<()> {
    let config = load_server_config(global, args)?;
    let warnings = ConfigValidator::validate_server(&config)?;
    print_warnings(&warnings, config.enable_color);

    if config.debug {
        eprintln!("{}", crate::build_info());
        eprintln!("Server Configuration:\n{}\n", display_server_summary(&config));
    }

    server::run(config).await
}

async fn run_measure(global: &GlobalArgs, args: &MeasureArgs) -> Result<()> {
    let config = load_config(global, args)?;
    let warnings = validate_config(&config)?;
    print_warnings(&warnings, config.enable_color);

    if config.debug {
        eprintln!("{}", crate::build_info());
        eprintln!("Configuration Summary:\n{}\n", display_config_summary(&config));
    }

    let session = MeasurementSession::new(config).await?;
    let reports = session.run(|line| println!("{}", line)).await;
    overall_result(&reports)
}

fn run_env(action: &EnvAction) -> Result<()> {
    match action {
        EnvAction::Example { output: None } => {
            print!("{}", EnvManager::create_example_env_content());
            Ok(())
        }
        EnvAction::Example { output: Some(path) } => {
            EnvManager::save_example_env_file(path)?;
            println!("Wrote example configuration to {}", path.display());
            Ok(())
        }
        EnvAction::Check { path } => {
            let problems = EnvManager::check_env_file(path)?
                .ok_or_else(|| AppError::config(format!("No env file at {}", path.display())))?;

            if problems.is_empty() {
                println!("{}: all values valid", path.display());
                return Ok(());
            }
            for problem in &problems {
                eprintln!("  {}", problem);
            }
            Err(AppError::validation(format!(
                "{} invalid value(s) in {}",
                problems.len(),
                path.display()
            )))
        }
        EnvAction::Vars => {
            print!("{}", EnvManager::display_env_help());
            Ok(())
        }
    }
}

fn print_warnings(warnings: &[ValidationWarning], use_color: bool) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("Configuration Warnings:");
    for warning in warnings {
        eprintln!("  {}", warning.format(use_color));
    }
    eprintln!();
}

/// One measurement run: every configured direction, measured in order
pub struct MeasurementSession {
    config: Config,
    repeater: TrialRepeater,
    stats: StatisticsEngine,
    coordinator: OutputCoordinator,
    logger: Logger,
    error_logger: ErrorEventLogger,
}

impl MeasurementSession {
    /// Create a session that talks HTTP to the configured server
    pub async fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport).await
    }

    /// Create a session over any transport.
    ///
    /// Every logger in the session shares one session id.
    pub async fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let factory = LoggerFactory::new(config.clone());
        let transfer_logger = factory.create_transfer_logger().await;

        let driver = TransferDriver::new(&config, transport)?.with_logger(transfer_logger.clone());
        let repeater = TrialRepeater::new(Arc::new(driver), &config).with_logger(transfer_logger);
        let coordinator = OutputCoordinator::new(OutputFormatterFactory::create_formatter(
            config.enable_color,
            config.verbose,
        ));

        Ok(Self {
            repeater,
            stats: StatisticsEngine::new(),
            coordinator,
            logger: factory.create_logger("APP").await,
            error_logger: factory.create_error_logger().await,
            config,
        })
    }

    /// Measure every configured direction, handing each report line to `emit`
    /// as soon as it is known
    pub async fn run<F>(&self, mut emit: F) -> Vec<DirectionReport>
    where
        F: FnMut(&str),
    {
        let mut reports = Vec::with_capacity(self.config.directions.len());
        for &direction in &self.config.directions {
            reports.push(self.run_direction(direction, &mut emit).await);
        }
        reports
    }

    /// Measure one direction: heading, each trial, then the summary line
    pub async fn run_direction<F>(&self, direction: Direction, emit: &mut F) -> DirectionReport
    where
        F: FnMut(&str),
    {
        let operation = format!("{} measurement", direction);
        let correlation_id = self.logger.start_operation(&operation).await;
        self.logger
            .info(&format!("Measuring {} with {} trials", direction, self.repeater.trial_count()))
            .field("concurrency", self.config.concurrency)
            .field("payload_size", self.config.payload_size)
            .log()
            .await;

        emit(&self.coordinator.display_header(direction));

        let trials = self
            .repeater
            .run(direction, |record| emit(&self.coordinator.display_trial(record)))
            .await;

        let report = match self.stats.aggregate(&trials) {
            Ok(aggregate) => DirectionReport {
                direction,
                trials,
                aggregate: Some(aggregate),
                failure: None,
            },
            Err(error) => {
                self.error_logger
                    .log_error(&error, Some(&operation), Some(&correlation_id))
                    .await;

                DirectionReport {
                    direction,
                    trials,
                    aggregate: None,
                    failure: Some(match error {
                        AppError::Statistics(message) => message,
                        other => other.to_string(),
                    }),
                }
            }
        };

        emit(&self.coordinator.display_outcome(&report));
        self.logger
            .end_operation(&correlation_id, &operation, report.is_successful())
            .await;
        report
    }
}

/// Turn the reports into the process result: an error when any direction
/// produced no successful trial
pub fn overall_result(reports: &[DirectionReport]) -> Result<()> {
    let failed: Vec<&str> = reports
        .iter()
        .filter(|report| !report.is_successful())
        .map(|report| report.direction.label())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::transfer(format!(
            "{} measurement produced no successful trials",
            failed.join(" and ")
        )))
    }
}

//! Structured logging for the client and the payload server
//!
//! Entries carry JSON-valued fields and render either as a console line or as
//! one JSON object per line (debug mode). Report lines own stdout on the
//! client, so loggers there stay at warning level unless asked otherwise.

use crate::error::AppError;
use crate::models::{Config, ServerConfig, TaskOutcome};
use crate::types::Direction;
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    /// Groups the entries of one measured direction
    pub correlation_id: Option<String>,
    /// Sorted so console output is stable
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    current_correlation_id: Option<String>,
}

/// Named logger; clones share session and correlation context
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
    #[cfg(test)]
    captured: Option<Arc<std::sync::Mutex<Vec<LogEntry>>>>,
}

impl Logger {
    /// Logger at info level with colored console output
    pub fn new(name: String) -> Self {
        Self::with_settings(name, LogLevel::Info, false, false, true)
    }

    /// Create a logger for the measuring client.
    ///
    /// The client stays quiet (warnings only) unless verbose or debug is set,
    /// so the report lines are the only stdout output.
    pub fn with_config(name: String, config: &Config) -> Self {
        Self::with_settings(name, LogLevel::Warn, config.verbose, config.debug, config.enable_color)
    }

    /// Create a logger for the payload server, which logs transfers at info
    pub fn with_server_config(name: String, config: &ServerConfig) -> Self {
        Self::with_settings(name, LogLevel::Info, config.verbose, config.debug, config.enable_color)
    }

    fn with_settings(name: String, quiet_level: LogLevel, verbose: bool, debug: bool, use_color: bool) -> Self {
        let min_level = match (debug, verbose) {
            (true, _) => LogLevel::Debug,
            (false, true) => LogLevel::Info.min(quiet_level),
            (false, false) => quiet_level,
        };

        Self {
            min_level,
            use_color,
            format: if debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
            #[cfg(test)]
            captured: None,
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keep a copy of every written entry, shared with clones made afterwards
    #[cfg(test)]
    pub(crate) fn capture(&mut self) -> Arc<std::sync::Mutex<Vec<LogEntry>>> {
        let captured = Arc::new(std::sync::Mutex::new(Vec::new()));
        self.captured = Some(Arc::clone(&captured));
        captured
    }

    /// Tag every later entry with `session_id`
    pub async fn set_session_id(&self, session_id: String) {
        self.context.write().await.session_id = Some(session_id);
    }

    /// Open a correlated operation; entries logged until
    /// [`Logger::end_operation`] carry its id
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.context.write().await.current_correlation_id = Some(correlation_id.clone());

        self.debug(&format!("Started {}", operation_name))
            .field("operation", operation_name)
            .log()
            .await;

        correlation_id
    }

    /// Close the operation opened by [`Logger::start_operation`]
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Finished {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    /// Start an entry at `level`
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                logger: self.name.clone(),
                message: message.to_string(),
                correlation_id: None,
                fields: BTreeMap::new(),
            },
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Whether an entry at `level` would be written
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().await;
            if let Some(session_id) = &context.session_id {
                entry.fields.insert("session_id".into(), session_id.clone().into());
            }
            if entry.correlation_id.is_none() {
                entry.correlation_id = context.current_correlation_id.clone();
            }
        }

        #[cfg(test)]
        {
            if let Some(captured) = &self.captured {
                if let Ok(mut entries) = captured.lock() {
                    entries.push(entry.clone());
                }
            }
        }

        let line = self.render(&entry);
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    /// Render an entry in the configured format
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.render_console(entry),
            LogFormat::Json => serde_json::to_string(entry)
                .unwrap_or_else(|e| format!("{{\"message\":{:?},\"error\":{:?}}}", entry.message, e.to_string())),
        }
    }

    fn render_console(&self, entry: &LogEntry) -> String {
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color {
            level.color(entry.level.color()).to_string()
        } else {
            level
        };

        let mut line = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );

        if let Some(id) = &entry.correlation_id {
            line.push_str(&format!(" [{}]", id.get(..8).unwrap_or(id)));
        }

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            line.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        line
    }
}

/// Adds fields to an entry before it is written
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field; values that fail to serialize are skipped
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    /// Add the fields of a finished transfer task
    pub fn transfer(self, outcome: &TaskOutcome) -> Self {
        self.field("task", outcome.index)
            .field("status", outcome.status)
            .field("bytes", outcome.bytes)
            .field("duration_ms", outcome.duration.as_secs_f64() * 1000.0)
            .field("http_status", outcome.http_status)
    }

    /// Add the category and exit code of an error
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Entry as it stands, without writing it
    pub fn build(self) -> LogEntry {
        self.entry
    }

    /// Write the entry if its level passes the logger's threshold
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for transfer tasks, batches and trials
#[derive(Clone)]
pub struct TransferLogger {
    logger: Logger,
}

impl TransferLogger {
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("XFER".to_string(), config))
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log a task that failed or timed out; the batch carries on without it
    pub async fn log_task_failure(&self, direction: Direction, url: &str, outcome: &TaskOutcome) {
        let message = format!(
            "{} task {} against {} failed: {}",
            direction,
            outcome.index,
            url,
            outcome.error_message.as_deref().unwrap_or("unknown error")
        );

        self.logger
            .warn(&message)
            .field("direction", direction)
            .field("url", url)
            .transfer(outcome)
            .log()
            .await;
    }

    pub async fn log_task_success(&self, direction: Direction, url: &str, outcome: &TaskOutcome) {
        self.logger
            .debug(&format!("{} task {} moved {} bytes", direction, outcome.index, outcome.bytes))
            .field("direction", direction)
            .field("url", url)
            .transfer(outcome)
            .log()
            .await;
    }

    /// Log the merged result of one batch; partial batches log at warning
    pub async fn log_batch_summary(&self, direction: Direction, successful: usize, total: usize, elapsed: Duration) {
        let level = if successful == total { LogLevel::Info } else { LogLevel::Warn };

        self.logger
            .log(
                level,
                &format!(
                    "{} batch: {}/{} transfers succeeded in {:.3}s",
                    direction,
                    successful,
                    total,
                    elapsed.as_secs_f64()
                ),
            )
            .field("direction", direction)
            .field("successful_tasks", successful)
            .field("total_tasks", total)
            .field("elapsed_seconds", elapsed.as_secs_f64())
            .log()
            .await;
    }

    pub async fn log_trial(&self, direction: Direction, trial: u32, result: std::result::Result<f64, &AppError>) {
        let builder = match result {
            Ok(mbps) => self
                .logger
                .info(&format!("{} trial {} measured {:.2} Mbps", direction, trial, mbps))
                .field("mbps", mbps),
            Err(error) => self
                .logger
                .warn(&format!("{} trial {} failed: {}", direction, trial, error))
                .error_info(error),
        };

        builder.field("direction", direction).field("trial", trial).log().await;
    }
}

/// Logs application errors with their category and context
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR".to_string(), config),
        }
    }

    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log().await;
    }
}

/// Hands out loggers that share one session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_transfer_logger(&self) -> TransferLogger {
        TransferLogger::from_logger(self.create_logger("XFER").await)
    }

    pub async fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger {
            logger: self.create_logger("ERR").await,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

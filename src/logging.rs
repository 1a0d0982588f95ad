//! Structured logging for the speed test client
//!
//! This module provides:
//! - Leveled, structured log entries built through [`LogEntryBuilder`]
//! - Console, JSON and compact output formats
//! - A run-scoped session id shared by every component logger
//! - [`MeasurementLogger`] for probe, selection and session events

use crate::error::AppError;
use crate::models::{Config, MeasurementRecord, ServerDescriptor, SkipReason};
use crate::types::NetworkFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - per-candidate and per-phase detail
    Debug = 1,
    /// Info level - run progress
    Info = 2,
    /// Warning level - a family or step failed but the run continues
    Warn = 3,
    /// Error level - the run cannot produce a result
    Error = 4,
    /// Fatal level - process termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }

    /// Minimum level for a run with the given output flags
    pub fn for_config(config: &Config) -> Self {
        if config.is_quiet() {
            LogLevel::Error
        } else if config.debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Logger with configurable level, format and shared context
#[derive(Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Context shared by every clone of a logger
#[derive(Debug, Default)]
struct LogContext {
    /// Run-scoped session id
    session_id: Option<String>,
}

/// Logger for probe, selection and session events of one run
#[derive(Clone)]
pub struct MeasurementLogger {
    logger: Logger,
}

impl Logger {
    /// Create a new logger at Info level
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger following the run's quiet/json/debug flags. JSON
    /// runs log JSON lines so stderr stays machine-readable.
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            min_level: LogLevel::for_config(config),
            use_color: config.enable_color && !config.json,
            format: if config.json { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// A logger that only writes fatal entries
    pub fn disabled(name: &str) -> Self {
        let mut logger = Self::new(name.to_string());
        logger.min_level = LogLevel::Fatal;
        logger.format = LogFormat::Compact;
        logger
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the run-scoped session id
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        drop(context);

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                fields: HashMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Attach the family a measurement event belongs to
    pub fn family(self, family: NetworkFamily) -> Self {
        self.field("family", family.name())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

impl MeasurementLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("MEASURE".to_string(), config),
        }
    }

    /// Wrap an existing logger
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    /// Measurement logger that writes nothing below fatal
    pub fn disabled() -> Self {
        Self {
            logger: Logger::disabled("MEASURE"),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// A candidate dropped from a probing round
    pub async fn log_probe_skip(&self, family: NetworkFamily, server: &ServerDescriptor, reason: &SkipReason) {
        self.logger
            .debug(&format!("Skipping {}: {}", server.name, reason))
            .family(family)
            .field("server_id", server.id)
            .field("server", &server.server)
            .log()
            .await;
    }

    /// A candidate's selection latency
    pub async fn log_probe_result(&self, family: NetworkFamily, server: &ServerDescriptor, latency_ms: f64) {
        self.logger
            .debug(&format!("{} answered in {:.2} ms", server.name, latency_ms))
            .family(family)
            .field("server_id", server.id)
            .field("latency_ms", latency_ms)
            .log()
            .await;
    }

    /// Summary of one probing round
    pub async fn log_probe_round(&self, family: NetworkFamily, candidates: usize, reachable: usize) {
        self.logger
            .debug(&format!("{} of {} {} servers reachable", reachable, candidates, family))
            .family(family)
            .field("candidates", candidates)
            .field("reachable", reachable)
            .log()
            .await;
    }

    /// The selected server of a family
    pub async fn log_selection(&self, family: NetworkFamily, server: &ServerDescriptor, latency_ms: Option<f64>) {
        let mut builder = self
            .logger
            .info(&format!("Selected {} server {} ({})", family, server.name, server.host()))
            .family(family)
            .field("server_id", server.id);
        if let Some(latency) = latency_ms {
            builder = builder.field("latency_ms", latency);
        }
        builder.log().await;
    }

    /// Result of one session step
    pub async fn log_phase(&self, family: NetworkFamily, phase: &str, value: f64, unit: &str) {
        self.logger
            .debug(&format!("{} {}: {} {}", family, phase, value, unit))
            .family(family)
            .field("phase", phase)
            .field("value", value)
            .log()
            .await;
    }

    /// A family not attempted because it is unavailable
    pub async fn log_family_skipped(&self, family: NetworkFamily) {
        self.logger
            .info(&format!("{} is not available, skipping", family))
            .family(family)
            .log()
            .await;
    }

    /// Terminal outcome of one family
    pub async fn log_family_outcome(
        &self,
        family: NetworkFamily,
        outcome: std::result::Result<&MeasurementRecord, &AppError>,
    ) {
        match outcome {
            Ok(record) => {
                self.logger
                    .info(&format!("{} measurement finished", family))
                    .family(family)
                    .field("server", &record.server_name)
                    .field("ping_ms", record.ping)
                    .field("download", record.download)
                    .field("upload", record.upload)
                    .log()
                    .await;
            }
            Err(error) => {
                self.logger
                    .warn(&format!("{} measurement failed: {}", family, error))
                    .family(family)
                    .error_info(error)
                    .log()
                    .await;
            }
        }
    }
}

/// Hands out component loggers that share one run-scoped session id
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

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_measurement_logger(&self) -> MeasurementLogger {
        MeasurementLogger::from_logger(self.create_logger("MEASURE").await)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

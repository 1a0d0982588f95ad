//! Error handling for the dual-stack speed test client

use thiserror::Error;

/// Custom error types for the speed test client
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// DNS resolution errors
    #[error("DNS resolution error: {0}")]
    DnsResolution(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, child processes)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, addresses)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// A peer answered with something outside its wire contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Every candidate of a probing round was dropped
    #[error("No server is currently available: {0}")]
    NoReachableServer(String),

    /// The selected server failed its liveness re-check
    #[error("Server not responding: {0}")]
    ServerNotResponding(String),

    /// A ping/download/upload step of a measurement session failed
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// Session registration API errors
    #[error("API error: {0}")]
    Api(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new DNS resolution error
    pub fn dns_resolution<S: Into<String>>(message: S) -> Self {
        Self::DnsResolution(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new "no reachable server" error
    pub fn no_reachable_server<S: Into<String>>(message: S) -> Self {
        Self::NoReachableServer(message.into())
    }

    /// Create a new "server not responding" error
    pub fn server_not_responding<S: Into<String>>(message: S) -> Self {
        Self::ServerNotResponding(message.into())
    }

    /// Create a new measurement error
    pub fn measurement<S: Into<String>>(message: S) -> Self {
        Self::Measurement(message.into())
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::DnsResolution(_) => "DNS",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Protocol(_) => "PROTOCOL",
            Self::NoReachableServer(_) => "NO_SERVER",
            Self::ServerNotResponding(_) => "SERVER_DOWN",
            Self::Measurement(_) => "MEASUREMENT",
            Self::Api(_) => "API",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if a later, fresh attempt could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::DnsResolution(_) => true,
            Self::NoReachableServer(_) | Self::ServerNotResponding(_) | Self::Measurement(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Protocol(_) | Self::Api(_) | Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) => 2,  // Network issues
            Self::Timeout(_) => 3,
            Self::Api(_) | Self::Protocol(_) => 4,  // Remote service misbehaved
            Self::Io(_) => 5,
            Self::NoReachableServer(_) | Self::ServerNotResponding(_) | Self::Measurement(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::DnsResolution(_) | Self::HttpRequest(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Api(_) | Self::Protocol(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) | Self::NoReachableServer(_) | Self::ServerNotResponding(_) | Self::Measurement(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else if error.is_decode() {
            Self::parse(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::dns_resolution(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Prefix the error message with lazily built context, keeping its kind
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Prefix the error message with static context, keeping its kind
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(&f()))
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

impl AppError {
    /// Rebuild the error with `prefix: ` in front of its message
    fn prefixed(self, prefix: &str) -> Self {
        let wrap = |msg: String| format!("{}: {}", prefix, msg);
        match self {
            Self::Config(m) => Self::Config(wrap(m)),
            Self::Network(m) => Self::Network(wrap(m)),
            Self::DnsResolution(m) => Self::DnsResolution(wrap(m)),
            Self::HttpRequest(m) => Self::HttpRequest(wrap(m)),
            Self::Timeout(m) => Self::Timeout(wrap(m)),
            Self::Validation(m) => Self::Validation(wrap(m)),
            Self::Io(m) => Self::Io(wrap(m)),
            Self::Parse(m) => Self::Parse(wrap(m)),
            Self::Protocol(m) => Self::Protocol(wrap(m)),
            Self::NoReachableServer(m) => Self::NoReachableServer(wrap(m)),
            Self::ServerNotResponding(m) => Self::ServerNotResponding(wrap(m)),
            Self::Measurement(m) => Self::Measurement(wrap(m)),
            Self::Api(m) => Self::Api(wrap(m)),
            Self::Internal(m) => Self::Internal(wrap(m)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(AppError::config("x").category(), "CONFIG");
        assert_eq!(AppError::protocol("x").category(), "PROTOCOL");
        assert_eq!(AppError::no_reachable_server("x").category(), "NO_SERVER");
        assert_eq!(AppError::server_not_responding("x").category(), "SERVER_DOWN");
        assert_eq!(AppError::measurement("x").category(), "MEASUREMENT");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 1);
        assert_eq!(AppError::network("x").exit_code(), 2);
        assert_eq!(AppError::timeout("x").exit_code(), 3);
        assert_eq!(AppError::api("x").exit_code(), 4);
        assert_eq!(AppError::no_reachable_server("x").exit_code(), 6);
        assert_eq!(AppError::internal("x").exit_code(), 99);
    }

    #[test]
    fn test_recoverability() {
        assert!(AppError::network("x").is_recoverable());
        assert!(AppError::server_not_responding("x").is_recoverable());
        assert!(!AppError::protocol("x").is_recoverable());
        assert!(!AppError::config("x").is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let error = AppError::protocol("invalid telemetry response: malformed");
        assert_eq!(error.to_string(), "Protocol error: invalid telemetry response: malformed");

        let error = AppError::server_not_responding("Tokyo (speed.example.net)");
        assert!(error.to_string().starts_with("Server not responding"));
    }

    #[test]
    fn test_context_keeps_error_kind() {
        let result: std::result::Result<(), AppError> = Err(AppError::timeout("read timed out"));
        let error = result.context("download").unwrap_err();
        assert!(matches!(error, AppError::Timeout(_)));
        assert_eq!(error.to_string(), "Timeout error: download: read timed out");
    }

    #[test]
    fn test_conversions() {
        let error: AppError = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err().into();
        assert!(matches!(error, AppError::Parse(_)));

        let error: AppError = url::Url::parse("::nope").unwrap_err().into();
        assert!(matches!(error, AppError::Parse(_)));

        let error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(error, AppError::Io(_)));
    }

    #[test]
    fn test_console_format_plain() {
        let error = AppError::measurement("upload failed");
        assert_eq!(
            error.format_for_console(false),
            "[MEASUREMENT] Measurement error: upload failed"
        );
    }
}

//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load the given env file if it exists
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
        let mut content = String::from(
            "# Dual-Stack Speed Test Configuration\n\
             #\n\
             # Values here are used as defaults and can be overridden by\n\
             # SPEEDTEST_* environment variables and command-line flags.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "SPEEDTEST_ENDPOINT" | "SPEEDTEST_IPV4_ENDPOINT" | "SPEEDTEST_IPV6_ENDPOINT" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!("{} must use http or https: {}", key, value)));
                }
            }
            "SPEEDTEST_SOURCE" => {
                value
                    .parse::<std::net::IpAddr>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "SPEEDTEST_CONCURRENCY" => {
                let n: u32 = parse(key, value)?;
                if n == 0 || n > crate::defaults::MAX_CONCURRENCY {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_CONCURRENCY,
                        n
                    )));
                }
            }
            "SPEEDTEST_CHUNKS" | "SPEEDTEST_UPLOAD_SIZE" => {
                let n: u32 = parse(key, value)?;
                if n == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            "SPEEDTEST_DURATION" | "SPEEDTEST_TIMEOUT" => {
                let secs: u64 = parse(key, value)?;
                if secs == 0 || secs > crate::defaults::MAX_DURATION_SECS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key,
                        crate::defaults::MAX_DURATION_SECS,
                        secs
                    )));
                }
            }
            "SPEEDTEST_USE_ICMP" | "SPEEDTEST_IGNORE_TLS_ERROR" | "SPEEDTEST_ENABLE_COLOR" => {
                parse::<bool>(key, value)?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEEDTEST_ENDPOINT", "Registration API endpoint", crate::defaults::DEFAULT_ENDPOINT),
            ("SPEEDTEST_IPV4_ENDPOINT", "IPv4-only API endpoint", crate::defaults::DEFAULT_IPV4_ENDPOINT),
            ("SPEEDTEST_IPV6_ENDPOINT", "IPv6-only API endpoint", crate::defaults::DEFAULT_IPV6_ENDPOINT),
            ("SPEEDTEST_DEVICE_ID", "Custom device id", "my-device"),
            ("SPEEDTEST_ORG_TAG", "Organisation tag", "lab"),
            ("SPEEDTEST_FREE_TAG", "Free-form tag", "rack-3"),
            ("SPEEDTEST_SOURCE", "Local source address", "192.0.2.10"),
            ("SPEEDTEST_INTERFACE", "Network interface", "eth0"),
            ("SPEEDTEST_CA_CERT", "Extra PEM root certificate", "/etc/ssl/extra.pem"),
            ("SPEEDTEST_USE_ICMP", "Use the system ping tool", "false"),
            ("SPEEDTEST_IGNORE_TLS_ERROR", "Accept invalid TLS certificates", "false"),
            ("SPEEDTEST_CONCURRENCY", "Parallel throughput streams (1-32)", "3"),
            ("SPEEDTEST_CHUNKS", "Chunks per download request", "100"),
            ("SPEEDTEST_UPLOAD_SIZE", "Upload payload size in KiB", "1024"),
            ("SPEEDTEST_DURATION", "Throughput phase bound in seconds (1-300)", "15"),
            ("SPEEDTEST_TIMEOUT", "API request timeout in seconds (1-300)", "5"),
            ("SPEEDTEST_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<28} {}\n", var, description));
            help.push_str(&format!("  {:<28} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Warnings for currently set variables that fail validation
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var, _, _)| {
                let value = std::env::var(var).ok()?;
                Self::validate_env_var(var, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Dual-Stack Speed Test - measures IPv4 and IPv6 throughput separately
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dsst")]
#[command(version = crate::build_info::LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Print only one summary line per family
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the result as JSON (implies --quiet)
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Accept invalid TLS certificates of measurement servers
    #[arg(short = 'k', long = "ignore-tls-error")]
    pub ignore_tls_error: bool,

    /// Additional PEM root certificate for measurement servers
    #[arg(long, value_name = "FILE")]
    pub ca_cert: Option<String>,

    /// Organisation tag attached to the session
    #[arg(short = 'O', long = "orgtag", value_name = "TAG")]
    pub org_tag: Option<String>,

    /// Free-form tag attached to the session
    #[arg(short = 'F', long = "freetag", value_name = "TAG", hide = true)]
    pub free_tag: Option<String>,

    /// Network interface for measurement traffic
    #[arg(short, long, value_name = "NAME")]
    pub interface: Option<String>,

    /// Local source address for measurement traffic
    #[arg(short, long, value_name = "ADDR")]
    pub source: Option<String>,

    /// Measure IPv4 only
    #[arg(short = '4', long = "ipv4")]
    pub ipv4: bool,

    /// Measure IPv6 only
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// Use the system ping tool instead of HTTP pings
    #[arg(long)]
    pub icmp: bool,

    /// Custom device id
    #[arg(long = "deviceid", value_name = "ID")]
    pub device_id: Option<String>,

    /// Registration API endpoint
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// IPv4-only API endpoint
    #[arg(long, value_name = "URL")]
    pub ipv4_endpoint: Option<String>,

    /// IPv6-only API endpoint
    #[arg(long, value_name = "URL")]
    pub ipv6_endpoint: Option<String>,

    /// Parallel streams for download and upload
    #[arg(long, value_name = "N")]
    pub concurrency: Option<u32>,

    /// Chunks requested per download request
    #[arg(long, value_name = "N")]
    pub chunks: Option<u32>,

    /// Upload payload size in KiB
    #[arg(long, value_name = "KIB")]
    pub upload_size: Option<u32>,

    /// Duration bound of each throughput phase in seconds
    #[arg(long, value_parser = parse_duration, value_name = "SECS")]
    pub duration: Option<u64>,

    /// API request timeout in seconds
    #[arg(long, value_parser = parse_duration, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report rates in bytes instead of bits
    #[arg(long)]
    pub bytes: bool,

    /// Use 1024-based units
    #[arg(long)]
    pub mebibytes: bool,

    /// Generate a fresh upload payload for every request
    #[arg(long)]
    pub no_pre_allocate: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,

    /// Write an example .env file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub init_env: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.ipv4 && self.ipv6 {
            return Err("Cannot specify both --ipv4 and --ipv6".to_string());
        }

        if self.source.is_some() && self.interface.is_some() {
            return Err("incompatible options 'source' and 'interface'".to_string());
        }

        if self.quiet && self.verbose {
            return Err("Cannot specify both --quiet and --verbose".to_string());
        }

        Ok(())
    }

    /// Whether the run only prints help material and exits
    pub fn is_info_mode(&self) -> bool {
        self.env_help || self.init_env.is_some()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse a positive number of seconds, at most 300
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_DURATION_SECS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_DURATION_SECS
                ))
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
pub(crate) fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "dsst", "-d", "-q", "-k", "-O", "lab", "-F", "rack-3", "-s", "192.0.2.7", "-4", "-e",
            "https://api.example.net",
        ]);
        assert!(cli.debug);
        assert!(cli.quiet);
        assert!(cli.ignore_tls_error);
        assert_eq!(cli.org_tag.as_deref(), Some("lab"));
        assert_eq!(cli.free_tag.as_deref(), Some("rack-3"));
        assert_eq!(cli.source.as_deref(), Some("192.0.2.7"));
        assert!(cli.ipv4);
        assert!(!cli.ipv6);
        assert_eq!(cli.endpoint.as_deref(), Some("https://api.example.net"));
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::parse_from([
            "dsst",
            "--json",
            "--icmp",
            "--deviceid",
            "dev-42",
            "--interface",
            "eth1",
            "--ipv6-endpoint",
            "https://v6.example.net",
            "--concurrency",
            "6",
            "--duration",
            "5",
            "--upload-size",
            "256",
            "--mebibytes",
            "--no-pre-allocate",
        ]);
        assert!(cli.json);
        assert!(cli.icmp);
        assert_eq!(cli.device_id.as_deref(), Some("dev-42"));
        assert_eq!(cli.interface.as_deref(), Some("eth1"));
        assert_eq!(cli.ipv6_endpoint.as_deref(), Some("https://v6.example.net"));
        assert_eq!(cli.concurrency, Some(6));
        assert_eq!(cli.duration, Some(5));
        assert_eq!(cli.upload_size, Some(256));
        assert!(cli.mebibytes);
        assert!(cli.no_pre_allocate);
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_validation_conflicts() {
        let cli = Cli::parse_from(["dsst", "-4", "-6"]);
        assert!(cli.validate().unwrap_err().contains("--ipv4 and --ipv6"));

        let cli = Cli::parse_from(["dsst", "-s", "192.0.2.1", "-i", "eth0"]);
        assert!(cli.validate().unwrap_err().contains("incompatible options"));

        let cli = Cli::parse_from(["dsst", "--color", "--no-color"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["dsst", "-q", "--verbose"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["dsst", "-6", "-i", "eth0"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_use_colors() {
        assert!(!Cli::parse_from(["dsst", "--no-color"]).use_colors());
        assert!(Cli::parse_from(["dsst", "--color"]).use_colors());
        assert!(!Cli::parse_from(["dsst", "--json"]).use_colors());
    }

    #[test]
    fn test_info_mode() {
        assert!(Cli::parse_from(["dsst", "--env-help"]).is_info_mode());
        assert!(Cli::parse_from(["dsst", "--init-env", "/tmp/x.env"]).is_info_mode());
        assert!(!Cli::parse_from(["dsst"]).is_info_mode());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("1").unwrap(), 1);
        assert_eq!(parse_duration("300").unwrap(), 300);

        assert!(parse_duration("0").is_err());
        assert!(parse_duration("301").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10.5").is_err());
        assert!(parse_duration("+10").is_err());
        assert!(parse_duration("0x10").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn test_duration_flag_rejects_out_of_range() {
        assert!(Cli::try_parse_from(["dsst", "--duration", "0"]).is_err());
        assert!(Cli::try_parse_from(["dsst", "--timeout", "1000"]).is_err());
    }
}

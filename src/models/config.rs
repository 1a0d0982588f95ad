//! Configuration data model and validation

use crate::backend::{MeasurementSettings, RateUnit};
use crate::types::{AppError, FamilyRestriction, Result, SourceBinding};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Registration API endpoint reachable over both families
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// IPv4-only API endpoint (client info and MSS probing)
    #[serde(default = "default_ipv4_endpoint")]
    pub ipv4_endpoint: String,

    /// IPv6-only API endpoint (client info and MSS probing)
    #[serde(default = "default_ipv6_endpoint")]
    pub ipv6_endpoint: String,

    /// Custom device id; derived from the host name when unset
    #[serde(default)]
    pub device_id: Option<String>,

    /// Organisation tag attached to the session
    #[serde(default)]
    pub org_tag: Option<String>,

    /// Free-form tag attached to the session
    #[serde(default)]
    pub free_tag: Option<String>,

    /// Local source address for measurement traffic
    #[serde(default)]
    pub source: Option<String>,

    /// Network interface for measurement traffic
    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default)]
    pub force_ipv4: bool,

    #[serde(default)]
    pub force_ipv6: bool,

    /// Use the system ping tool instead of HTTP pings
    #[serde(default)]
    pub use_icmp: bool,

    /// Accept invalid TLS certificates
    #[serde(default)]
    pub ignore_tls_errors: bool,

    /// Extra PEM root certificate for measurement servers
    #[serde(default)]
    pub ca_cert: Option<String>,

    /// Parallel streams for download and upload
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Chunks requested per download request
    #[serde(default = "default_chunks")]
    pub chunks: u32,

    /// Upload payload size in KiB
    #[serde(default = "default_upload_size")]
    pub upload_size: u32,

    /// Duration bound of each throughput phase
    #[serde(default = "default_duration_secs")]
    pub duration_seconds: u64,

    /// Report rates in bytes instead of bits
    #[serde(default)]
    pub bytes: bool,

    /// Use 1024-based units instead of 1000-based
    #[serde(default)]
    pub mebibytes: bool,

    /// Generate a fresh upload payload per request
    #[serde(default)]
    pub no_pre_allocate: bool,

    /// API request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Pause between the two family runs
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_seconds: u64,

    /// Print only the one-line-per-family summary
    #[serde(default)]
    pub quiet: bool,

    /// Print the simplified JSON result
    #[serde(default)]
    pub json: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            ipv4_endpoint: default_ipv4_endpoint(),
            ipv6_endpoint: default_ipv6_endpoint(),
            device_id: None,
            org_tag: None,
            free_tag: None,
            source: None,
            interface: None,
            force_ipv4: false,
            force_ipv6: false,
            use_icmp: false,
            ignore_tls_errors: false,
            ca_cert: None,
            concurrency: default_concurrency(),
            chunks: default_chunks(),
            upload_size: default_upload_size(),
            duration_seconds: default_duration_secs(),
            bytes: false,
            mebibytes: false,
            no_pre_allocate: false,
            timeout_seconds: default_timeout_secs(),
            cooldown_seconds: default_cooldown_secs(),
            quiet: false,
            json: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// API request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Throughput phase bound as Duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    /// Inter-family cooldown as Duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// Whether human-oriented progress output is suppressed
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.json
    }

    /// Source binding derived from `source` / `interface`
    pub fn source_binding(&self) -> Result<Option<SourceBinding>> {
        SourceBinding::from_options(self.source.as_deref(), self.interface.as_deref())
    }

    /// Family restriction derived from the force flags
    pub fn family_restriction(&self) -> Result<FamilyRestriction> {
        FamilyRestriction::from_flags(self.force_ipv4, self.force_ipv6)
    }

    /// Unit used to express throughput
    pub fn rate_unit(&self) -> RateUnit {
        RateUnit::from_flags(self.bytes, self.mebibytes)
    }

    /// Bundle handed to the measurement backend
    pub fn measurement_settings(&self) -> Result<MeasurementSettings> {
        Ok(MeasurementSettings {
            concurrency: self.concurrency,
            chunks: self.chunks,
            upload_size_kib: self.upload_size,
            duration: self.duration(),
            unit: self.rate_unit(),
            pre_allocate: !self.no_pre_allocate,
            use_icmp: self.use_icmp,
            source: self.source_binding()?,
        })
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        // Mutually exclusive options first, they mirror the CLI contract
        self.source_binding()?;
        self.family_restriction()?;

        for (name, endpoint) in [
            ("endpoint", &self.endpoint),
            ("IPv4 endpoint", &self.ipv4_endpoint),
            ("IPv6 endpoint", &self.ipv6_endpoint),
        ] {
            if endpoint.is_empty() {
                return Err(AppError::config(format!("The {} cannot be empty", name)));
            }
            let parsed = url::Url::parse(endpoint)
                .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", name, endpoint, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::config(format!("The {} must use http or https: {}", name, endpoint)));
            }
        }

        if let Some(interface) = &self.interface {
            if interface.trim().is_empty() {
                return Err(AppError::config("Interface name cannot be empty"));
            }
        }

        if let Some(path) = &self.ca_cert {
            if path.trim().is_empty() {
                return Err(AppError::config("CA certificate path cannot be empty"));
            }
        }

        if self.concurrency == 0 {
            return Err(AppError::config("Concurrency must be greater than 0"));
        }

        if self.concurrency > crate::defaults::MAX_CONCURRENCY {
            return Err(AppError::config(format!(
                "Concurrency cannot exceed {}",
                crate::defaults::MAX_CONCURRENCY
            )));
        }

        if self.chunks == 0 {
            return Err(AppError::config("Download chunks must be greater than 0"));
        }

        if self.upload_size == 0 {
            return Err(AppError::config("Upload size must be greater than 0"));
        }

        if self.duration_seconds == 0 {
            return Err(AppError::config("Duration must be greater than 0"));
        }

        if self.duration_seconds > crate::defaults::MAX_DURATION_SECS {
            return Err(AppError::config(format!(
                "Duration cannot exceed {} seconds",
                crate::defaults::MAX_DURATION_SECS
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Merge `SPEEDTEST_*` environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary key lookup (environment or test map)
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = text("SPEEDTEST_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = text("SPEEDTEST_IPV4_ENDPOINT") {
            self.ipv4_endpoint = v;
        }
        if let Some(v) = text("SPEEDTEST_IPV6_ENDPOINT") {
            self.ipv6_endpoint = v;
        }
        if let Some(v) = text("SPEEDTEST_DEVICE_ID") {
            self.device_id = Some(v);
        }
        if let Some(v) = text("SPEEDTEST_ORG_TAG") {
            self.org_tag = Some(v);
        }
        if let Some(v) = text("SPEEDTEST_FREE_TAG") {
            self.free_tag = Some(v);
        }
        if let Some(v) = text("SPEEDTEST_SOURCE") {
            self.source = Some(v);
        }
        if let Some(v) = text("SPEEDTEST_INTERFACE") {
            self.interface = Some(v);
        }
        if let Some(v) = text("SPEEDTEST_CA_CERT") {
            self.ca_cert = Some(v);
        }

        if let Some(v) = text("SPEEDTEST_USE_ICMP") {
            self.use_icmp = parse_env("SPEEDTEST_USE_ICMP", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_IGNORE_TLS_ERROR") {
            self.ignore_tls_errors = parse_env("SPEEDTEST_IGNORE_TLS_ERROR", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_CONCURRENCY") {
            self.concurrency = parse_env("SPEEDTEST_CONCURRENCY", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_CHUNKS") {
            self.chunks = parse_env("SPEEDTEST_CHUNKS", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_UPLOAD_SIZE") {
            self.upload_size = parse_env("SPEEDTEST_UPLOAD_SIZE", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_DURATION") {
            self.duration_seconds = parse_env("SPEEDTEST_DURATION", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_TIMEOUT") {
            self.timeout_seconds = parse_env("SPEEDTEST_TIMEOUT", &v)?;
        }
        if let Some(v) = text("SPEEDTEST_ENABLE_COLOR") {
            self.enable_color = parse_env("SPEEDTEST_ENABLE_COLOR", &v)?;
        }

        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

// Default value functions for serde
fn default_endpoint() -> String {
    crate::defaults::DEFAULT_ENDPOINT.to_string()
}

fn default_ipv4_endpoint() -> String {
    crate::defaults::DEFAULT_IPV4_ENDPOINT.to_string()
}

fn default_ipv6_endpoint() -> String {
    crate::defaults::DEFAULT_IPV6_ENDPOINT.to_string()
}

fn default_concurrency() -> u32 {
    crate::defaults::DEFAULT_CONCURRENCY
}

fn default_chunks() -> u32 {
    crate::defaults::DEFAULT_CHUNKS
}

fn default_upload_size() -> u32 {
    crate::defaults::DEFAULT_UPLOAD_SIZE
}

fn default_duration_secs() -> u64 {
    crate::defaults::DEFAULT_DURATION.as_secs()
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_API_TIMEOUT.as_secs()
}

fn default_cooldown_secs() -> u64 {
    crate::defaults::DEFAULT_COOLDOWN.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

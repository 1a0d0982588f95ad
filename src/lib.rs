//! Dual-Stack Speed Test
//!
//! A network speed test client that measures IPv4 and IPv6 connectivity
//! separately: it probes every candidate server for latency, selects one,
//! runs a ping/jitter/download/upload session against it and reports the
//! outcome to the server's telemetry endpoint.

pub mod api;
pub mod app;
pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod speedtest;
pub mod stats;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, MeasurementRecord, ResultPair, ServerDescriptor};
pub use speedtest::{DualStackOrchestrator, LatencyProbe, ServerSelector};
pub use types::NetworkFamily;

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata stamped by `build.rs`
pub mod build_info {
    pub const BUILD_TIME: &str = env!("BUILD_TIME");
    pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
    pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

    /// Version banner shown by `--version`
    pub const LONG_VERSION: &str = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT"),
        ", built ",
        env!("BUILD_TIME"),
        ", ",
        env!("TARGET_TRIPLE"),
        ")"
    );
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_ENDPOINT: &str = "https://api.inonius.net";
    pub const DEFAULT_IPV4_ENDPOINT: &str = "https://ipv4-api.inonius.net";
    pub const DEFAULT_IPV6_ENDPOINT: &str = "https://ipv6-api.inonius.net";

    /// Device id used when the host name cannot be read
    pub const FALLBACK_DEVICE_ID: &str = "111903fc-5e21-3052-83e4-1615a4760d0a";

    pub const DEFAULT_CONCURRENCY: u32 = 3;
    pub const DEFAULT_CHUNKS: u32 = 100;
    /// Upload payload size in KiB
    pub const DEFAULT_UPLOAD_SIZE: u32 = 1024;
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(15);
    pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_DURATION_SECS: u64 = 300;
    pub const MAX_CONCURRENCY: u32 = 32;

    /// Width of the latency probe worker pool
    pub const PROBE_WORKERS: usize = 10;
    /// Samples taken per candidate while selecting a server
    pub const SELECTION_PING_COUNT: u32 = 1;
    /// Samples taken by a measurement session
    pub const SESSION_PING_COUNT: u32 = 10;

    pub const TELEMETRY_PATH: &str = "/results/telemetry.php";
}

//! Measurement primitives: liveness, latency, download and upload
//!
//! The speed test core talks to servers only through [`MeasurementBackend`].
//! [`HttpBackend`] is the real implementation over reqwest and the system
//! ping tool; tests substitute scripted backends.

pub mod activity;
pub mod http;
pub mod icmp;

pub use activity::ActivityLog;
pub use http::HttpBackend;
pub use icmp::SystemPing;

use crate::{
    error::Result,
    models::ServerDescriptor,
    stats::{round2, LatencySummary},
    types::{NetworkFamily, SourceBinding},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit in which throughput figures are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateUnit {
    /// 10^6 bits per second
    #[default]
    MegabitsPerSecond,
    /// 2^20 bits per second
    MebibitsPerSecond,
    /// 10^6 bytes per second
    MegabytesPerSecond,
    /// 2^20 bytes per second
    MebibytesPerSecond,
}

impl RateUnit {
    /// Select the unit from the bytes / mebibytes flags
    pub fn from_flags(bytes: bool, mebibytes: bool) -> Self {
        match (bytes, mebibytes) {
            (false, false) => RateUnit::MegabitsPerSecond,
            (false, true) => RateUnit::MebibitsPerSecond,
            (true, false) => RateUnit::MegabytesPerSecond,
            (true, true) => RateUnit::MebibytesPerSecond,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateUnit::MegabitsPerSecond => "Mbps",
            RateUnit::MebibitsPerSecond => "Mibps",
            RateUnit::MegabytesPerSecond => "MB/s",
            RateUnit::MebibytesPerSecond => "MiB/s",
        }
    }

    /// Rate for `bytes` moved in `elapsed`, rounded to two decimals
    pub fn rate(&self, bytes: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        let bytes = bytes as f64;
        let value = match self {
            RateUnit::MegabitsPerSecond => bytes * 8.0 / 1_000_000.0,
            RateUnit::MebibitsPerSecond => bytes * 8.0 / 1_048_576.0,
            RateUnit::MegabytesPerSecond => bytes / 1_000_000.0,
            RateUnit::MebibytesPerSecond => bytes / 1_048_576.0,
        };
        round2(value / secs)
    }
}

/// Parameters of a measurement session
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSettings {
    /// Parallel transport streams for download/upload
    pub concurrency: u32,
    /// Chunks per download request
    pub chunks: u32,
    /// Upload payload size in KiB
    pub upload_size_kib: u32,
    /// Bound for each throughput phase
    pub duration: Duration,
    pub unit: RateUnit,
    /// Reuse one upload payload for every request
    pub pre_allocate: bool,
    pub use_icmp: bool,
    pub source: Option<SourceBinding>,
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self {
            concurrency: crate::defaults::DEFAULT_CONCURRENCY,
            chunks: crate::defaults::DEFAULT_CHUNKS,
            upload_size_kib: crate::defaults::DEFAULT_UPLOAD_SIZE,
            duration: crate::defaults::DEFAULT_DURATION,
            unit: RateUnit::default(),
            pre_allocate: true,
            use_icmp: false,
            source: None,
        }
    }
}

impl MeasurementSettings {
    /// Ping request with `count` samples for the given family
    pub fn ping_request(&self, count: u32, family: NetworkFamily) -> PingRequest {
        PingRequest {
            count,
            use_icmp: self.use_icmp,
            source: self.source.clone(),
            family,
        }
    }
}

/// Latency probe parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PingRequest {
    pub count: u32,
    pub use_icmp: bool,
    pub source: Option<SourceBinding>,
    pub family: NetworkFamily,
}

/// Result of a download or upload phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    /// Rate in the configured unit
    pub rate: f64,
    /// Bytes moved during the phase
    pub bytes: u64,
}

/// Capability set the speed test core needs from a server
#[async_trait]
pub trait MeasurementBackend: Send + Sync {
    /// Whether the server answers its ping URL with an empty 200
    async fn is_up(&self, server: &ServerDescriptor) -> bool;

    /// Latency and jitter over `request.count` samples
    async fn ping_and_jitter(&self, server: &ServerDescriptor, request: &PingRequest) -> Result<LatencySummary>;

    /// Download throughput, bounded by the settings
    async fn download(
        &self,
        server: &ServerDescriptor,
        settings: &MeasurementSettings,
        log: &ActivityLog,
    ) -> Result<ThroughputSample>;

    /// Upload throughput, bounded by the settings
    async fn upload(
        &self,
        server: &ServerDescriptor,
        settings: &MeasurementSettings,
        log: &ActivityLog,
    ) -> Result<ThroughputSample>;
}

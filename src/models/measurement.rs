//! Probe jobs, probe outcomes and per-family measurement records

use crate::models::ServerDescriptor;
use crate::types::NetworkFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One candidate queued for latency probing
#[derive(Debug, Clone)]
pub struct PingJob {
    /// Ordinal position in the candidate list
    pub index: usize,
    pub server: ServerDescriptor,
}

/// Measured single-sample latency of one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingResult {
    pub index: usize,
    pub latency_ms: f64,
}

/// Why a candidate was dropped from a probing round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The server address or ping path could not be turned into a URL
    InvalidUrl(String),
    /// The liveness check failed
    NotResponding,
    /// The latency probe itself returned an error
    ProbeFailed(String),
    /// The probe returned zero or a negative latency
    NonPositiveLatency,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidUrl(e) => write!(f, "invalid server URL: {}", e),
            SkipReason::NotResponding => f.write_str("server does not seem to be up"),
            SkipReason::ProbeFailed(e) => write!(f, "ping failed: {}", e),
            SkipReason::NonPositiveLatency => f.write_str("no usable latency"),
        }
    }
}

/// Outcome of probing one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Measured(PingResult),
    Skipped { index: usize, reason: SkipReason },
}

impl ProbeOutcome {
    pub fn index(&self) -> usize {
        match self {
            ProbeOutcome::Measured(result) => result.index,
            ProbeOutcome::Skipped { index, .. } => *index,
        }
    }
}

/// Outcome of one successful measurement session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub timestamp: DateTime<Utc>,
    pub family: NetworkFamily,
    pub server_name: String,
    pub server_url: String,
    /// Milliseconds
    pub ping: f64,
    /// Milliseconds
    pub jitter: f64,
    /// Configured rate unit, Mbps by default
    pub download: f64,
    pub upload: f64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub telemetry_id: Option<String>,
}

/// Per-family results of a dual-stack run; a slot stays empty when its
/// family was unavailable or its session failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPair {
    pub ipv4: Option<MeasurementRecord>,
    pub ipv6: Option<MeasurementRecord>,
}

impl ResultPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, family: NetworkFamily) -> Option<&MeasurementRecord> {
        match family {
            NetworkFamily::V4 => self.ipv4.as_ref(),
            NetworkFamily::V6 => self.ipv6.as_ref(),
        }
    }

    pub fn set(&mut self, family: NetworkFamily, record: Option<MeasurementRecord>) {
        match family {
            NetworkFamily::V4 => self.ipv4 = record,
            NetworkFamily::V6 => self.ipv6 = record,
        }
    }

    /// Telemetry id used to close out the session for this family
    pub fn telemetry_id(&self, family: NetworkFamily) -> Option<String> {
        self.get(family).and_then(|r| r.telemetry_id.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }
}

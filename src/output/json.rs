//! Simplified machine-readable result

use crate::models::{MeasurementRecord, RunReport};
use crate::types::NetworkFamily;
use serde::Serialize;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifiedClientInfo {
    pub ip: IpAddr,
    pub port: u16,
    pub is_ipv4: bool,
    pub org: String,
    pub mss: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifiedSpeedtestResult {
    pub speedtest_type: &'static str,
    /// Unix seconds of the measurement
    pub timestamp: i64,
    pub server: String,
    pub upload: f64,
    pub download: f64,
    pub ping: f64,
    pub jitter: f64,
}

impl From<&MeasurementRecord> for SimplifiedSpeedtestResult {
    fn from(record: &MeasurementRecord) -> Self {
        Self {
            speedtest_type: record.family.name(),
            timestamp: record.timestamp.timestamp(),
            server: record.server_name.clone(),
            upload: record.upload,
            download: record.download,
            ping: record.ping,
            jitter: record.jitter,
        }
    }
}

/// Flat view of a run; the result list only holds families that measured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifiedResult {
    /// Unix seconds of the session creation
    pub timestamp: i64,
    pub ipv4_available: bool,
    pub ipv6_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_info: Option<SimplifiedClientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_info: Option<SimplifiedClientInfo>,
    pub result: Vec<SimplifiedSpeedtestResult>,
}

impl SimplifiedResult {
    pub fn from_report(report: &RunReport) -> Self {
        let info = |family| {
            report.family_info(family).map(|info| SimplifiedClientInfo {
                ip: info.client.ip,
                port: info.client.port,
                is_ipv4: info.client.is_ipv4,
                org: info.client.ip_info.org.clone(),
                mss: info.mss,
            })
        };

        let result = [NetworkFamily::V4, NetworkFamily::V6]
            .into_iter()
            .filter(|family| report.is_available(*family))
            .filter_map(|family| report.results.get(family))
            .map(SimplifiedSpeedtestResult::from)
            .collect();

        Self {
            timestamp: report.created_at.timestamp(),
            ipv4_available: report.is_available(NetworkFamily::V4),
            ipv6_available: report.is_available(NetworkFamily::V6),
            ipv4_info: info(NetworkFamily::V4),
            ipv6_info: info(NetworkFamily::V6),
            result,
        }
    }
}

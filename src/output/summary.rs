//! Human-readable run summary with optional terminal colors

use crate::models::{MeasurementRecord, RunReport};
use crate::types::NetworkFamily;
use colored::*;
use std::fmt::Write as _;

/// Latency classification used to color RTT values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl LatencyLevel {
    pub fn from_latency(ms: f64) -> Self {
        if ms < 20.0 {
            Self::Excellent
        } else if ms < 50.0 {
            Self::Good
        } else if ms < 150.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Renders the per-family summary block
pub struct SummaryFormatter {
    use_color: bool,
    unit: &'static str,
    scheme: ColorScheme,
}

impl SummaryFormatter {
    pub fn new(use_color: bool, unit: &'static str) -> Self {
        Self {
            use_color,
            unit,
            scheme: ColorScheme::default(),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.use_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str, color: Color) -> String {
        if self.use_color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format(&self, report: &RunReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.bold("Dual-Stack Speed Test Results", self.scheme.header));
        let _ = writeln!(
            out,
            "{}",
            self.paint(&format!("Session {}", report.session_uuid), self.scheme.muted)
        );

        for family in NetworkFamily::ordered(report.prefer_ipv6) {
            out.push('\n');
            out.push_str(&self.format_family(report, family));
        }

        out
    }

    fn format_family(&self, report: &RunReport, family: NetworkFamily) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.bold(family.name(), self.scheme.header));

        let Some(info) = report.family_info(family) else {
            let _ = writeln!(out, "  {}", self.paint("not available", self.scheme.muted));
            return out;
        };

        let mss = info
            .mss
            .map(|m| m.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(out, "  Address:  {} ({})", info.client.ip, info.client.ip_info.org);
        let _ = writeln!(out, "  MSS:      {}", mss);

        match report.results.get(family) {
            Some(record) => out.push_str(&self.format_record(record)),
            None => {
                let _ = writeln!(out, "  {}", self.paint("measurement failed", self.scheme.error));
            }
        }
        out
    }

    fn format_record(&self, record: &MeasurementRecord) -> String {
        let level = LatencyLevel::from_latency(record.ping);
        let mut out = String::new();
        let _ = writeln!(out, "  Server:   {}", record.server_name);
        let _ = writeln!(
            out,
            "  Ping:     {} (jitter {:.2} ms)",
            self.paint(&format!("{:.2} ms", record.ping), level.color()),
            record.jitter
        );
        let _ = writeln!(
            out,
            "  Download: {}",
            self.paint(&format!("{:.2} {}", record.download, self.unit), self.scheme.success)
        );
        let _ = writeln!(
            out,
            "  Upload:   {}",
            self.paint(&format!("{:.2} {}", record.upload, self.unit), self.scheme.success)
        );
        out
    }
}

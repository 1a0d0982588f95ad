//! Result rendering for the three output modes

mod summary;
mod json;

pub use summary::{ColorScheme, LatencyLevel, SummaryFormatter};
pub use json::{SimplifiedClientInfo, SimplifiedResult, SimplifiedSpeedtestResult};

use crate::{
    error::Result,
    models::{Config, RunReport},
    types::NetworkFamily,
};

/// How the final result is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Quiet,
    Json,
}

impl OutputMode {
    pub fn from_config(config: &Config) -> Self {
        if config.json {
            OutputMode::Json
        } else if config.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }
}

/// Chooses the renderer for a run report
pub struct OutputCoordinator {
    mode: OutputMode,
    use_color: bool,
    unit: &'static str,
}

impl OutputCoordinator {
    pub fn new(mode: OutputMode, use_color: bool, unit: &'static str) -> Self {
        Self { mode, use_color, unit }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            OutputMode::from_config(config),
            config.enable_color,
            config.rate_unit().label(),
        )
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn render(&self, report: &RunReport) -> Result<String> {
        match self.mode {
            OutputMode::Human => Ok(SummaryFormatter::new(self.use_color, self.unit).format(report)),
            OutputMode::Quiet => Ok(self.quiet_lines(report).join("\n")),
            OutputMode::Json => Ok(serde_json::to_string(&SimplifiedResult::from_report(report))?),
        }
    }

    /// One line per reachable family, IPv4 first
    pub fn quiet_lines(&self, report: &RunReport) -> Vec<String> {
        [NetworkFamily::V4, NetworkFamily::V6]
            .into_iter()
            .filter_map(|family| {
                let info = report.family_info(family)?;
                let record = report.results.get(family);
                let tag = family.name();
                let value = |v: Option<String>| v.unwrap_or_else(|| "n/a".to_string());

                Some(format!(
                    "{tag}Address {} {tag}mss {} {tag}Upload {} {unit} {tag}Download {} {unit} {tag}RTT {} ms {tag}Jitter {} ms",
                    info.client.ip,
                    value(info.mss.map(|m| m.to_string())),
                    value(record.map(|r| r.upload.to_string())),
                    value(record.map(|r| r.download.to_string())),
                    value(record.map(|r| format!("{:.2}", r.ping))),
                    value(record.map(|r| r.jitter.to_string())),
                    unit = self.unit,
                ))
            })
            .collect()
    }
}

//! One full ping, download, upload and telemetry run against a server

use super::telemetry::{TelemetryExtra, TelemetryReport, TelemetrySink};
use crate::{
    backend::{ActivityLog, MeasurementBackend, MeasurementSettings},
    defaults::SESSION_PING_COUNT,
    error::{AppError, Result},
    logging::MeasurementLogger,
    models::{MeasurementRecord, ServerDescriptor},
    stats::round2,
    types::NetworkFamily,
};
use chrono::Utc;
use std::sync::Arc;

/// Runs the measurement sequence against one selected server.
///
/// Steps run strictly in order and the first failure aborts the session;
/// no partial record is produced and nothing is retried.
pub struct MeasurementSession {
    backend: Arc<dyn MeasurementBackend>,
    telemetry: Arc<dyn TelemetrySink>,
    settings: MeasurementSettings,
    logger: MeasurementLogger,
}

impl MeasurementSession {
    pub fn new(
        backend: Arc<dyn MeasurementBackend>,
        telemetry: Arc<dyn TelemetrySink>,
        settings: MeasurementSettings,
    ) -> Self {
        Self {
            backend,
            telemetry,
            settings,
            logger: MeasurementLogger::disabled(),
        }
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn settings(&self) -> &MeasurementSettings {
        &self.settings
    }

    pub async fn run(&self, family: NetworkFamily, server: &ServerDescriptor) -> Result<MeasurementRecord> {
        if !self.backend.is_up(server).await {
            return Err(AppError::server_not_responding(format!(
                "{} ({})",
                server.name,
                server.host()
            )));
        }

        let request = self.settings.ping_request(SESSION_PING_COUNT, family);
        let latency = self.backend.ping_and_jitter(server, &request).await?;
        self.logger.log_phase(family, "ping", latency.latency_ms, "ms").await;
        self.logger.log_phase(family, "jitter", latency.jitter_ms, "ms").await;

        let activity = ActivityLog::new();
        let unit = self.settings.unit.label();

        let download = self.backend.download(server, &self.settings, &activity).await?;
        self.logger.log_phase(family, "download", download.rate, unit).await;

        let upload = self.backend.upload(server, &self.settings, &activity).await?;
        self.logger.log_phase(family, "upload", upload.rate, unit).await;

        let report = TelemetryReport {
            download: download.rate,
            upload: upload.rate,
            ping: latency.latency_ms,
            jitter: latency.jitter_ms,
            log: activity.render(),
            extra: TelemetryExtra {
                server: server.name.clone(),
            },
        };
        let telemetry_id = self.telemetry.submit(server, &report).await?;

        Ok(MeasurementRecord {
            timestamp: Utc::now(),
            family,
            server_name: server.name.clone(),
            server_url: server.server.clone(),
            ping: round2(latency.latency_ms),
            jitter: round2(latency.jitter_ms),
            download: round2(download.rate),
            upload: round2(upload.rate),
            bytes_received: download.bytes,
            bytes_sent: upload.bytes,
            telemetry_id: Some(telemetry_id),
        })
    }
}

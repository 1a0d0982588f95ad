//! Server selection and measurement orchestration
//!
//! Per family: [`LatencyProbe`] measures every candidate, [`ServerSelector`]
//! picks one, [`MeasurementSession`] runs ping, download, upload and
//! telemetry against it. [`DualStackOrchestrator`] sequences the two
//! families around a cooldown.

pub mod orchestrator;
pub mod probe;
pub mod selector;
pub mod session;
pub mod telemetry;

pub use orchestrator::{Cooldown, DualStackOrchestrator, FamilyPlan, FamilyRunner, FixedCooldown};
pub use probe::LatencyProbe;
pub use selector::ServerSelector;
use selector::candidate;
pub use session::MeasurementSession;
pub use telemetry::{TelemetryExtra, TelemetryReport, TelemetryReporter, TelemetrySink};

use crate::{
    backend::{HttpBackend, MeasurementBackend, MeasurementSettings},
    client::ClientFactory,
    defaults::SELECTION_PING_COUNT,
    error::{AppError, Result},
    logging::MeasurementLogger,
    models::{MeasurementRecord, ServerDescriptor},
    types::NetworkFamily,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Backend and telemetry sink bound to one family
#[derive(Clone)]
pub struct FamilyStack {
    pub backend: Arc<dyn MeasurementBackend>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// Probe, select and measure for whichever family the orchestrator asks for
pub struct SpeedtestRunner {
    /// A family whose transport could not be built keeps the reason
    stacks: HashMap<NetworkFamily, std::result::Result<FamilyStack, String>>,
    settings: MeasurementSettings,
    logger: MeasurementLogger,
}

impl SpeedtestRunner {
    pub fn new(settings: MeasurementSettings) -> Self {
        Self {
            stacks: HashMap::new(),
            settings,
            logger: MeasurementLogger::disabled(),
        }
    }

    /// Build HTTP backends and telemetry reporters for both families
    pub fn from_factory(factory: &ClientFactory, settings: MeasurementSettings) -> Self {
        let mut runner = Self::new(settings);
        for family in [NetworkFamily::V4, NetworkFamily::V6] {
            let stack = factory
                .measurement_client(family)
                .map(|client| FamilyStack {
                    backend: Arc::new(HttpBackend::new(
                        client.clone(),
                        family,
                        factory.settings().probe_timeout,
                    )),
                    telemetry: Arc::new(TelemetryReporter::new(client, factory.settings().api_timeout)),
                })
                .map_err(|e| e.to_string());
            runner.stacks.insert(family, stack);
        }
        runner
    }

    pub fn with_family(mut self, family: NetworkFamily, stack: FamilyStack) -> Self {
        self.stacks.insert(family, Ok(stack));
        self
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    fn stack(&self, family: NetworkFamily) -> Result<&FamilyStack> {
        match self.stacks.get(&family) {
            Some(Ok(stack)) => Ok(stack),
            Some(Err(reason)) => Err(AppError::config(reason.clone())),
            None => Err(AppError::internal(format!("No transport configured for {}", family))),
        }
    }
}

#[async_trait]
impl FamilyRunner for SpeedtestRunner {
    async fn run_family(&self, family: NetworkFamily, servers: &[ServerDescriptor]) -> Result<MeasurementRecord> {
        let stack = self.stack(family)?;

        let probe = LatencyProbe::new(stack.backend.clone()).with_logger(self.logger.clone());
        let request = self.settings.ping_request(SELECTION_PING_COUNT, family);
        let latencies = probe.measure(servers, &request).await?;

        let index = ServerSelector::new().select_index(&latencies)?;
        let server = candidate(servers, index)?;
        self.logger
            .log_selection(family, server, latencies.get(&index).copied())
            .await;

        MeasurementSession::new(stack.backend.clone(), stack.telemetry.clone(), self.settings.clone())
            .with_logger(self.logger.clone())
            .run(family, server)
            .await
    }
}

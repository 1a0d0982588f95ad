//! Sequential per-family runs with a cooldown between them

use crate::{
    error::Result,
    logging::MeasurementLogger,
    models::{MeasurementRecord, ResultPair, ServerDescriptor},
    types::NetworkFamily,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Selection plus measurement session for one family
#[async_trait]
pub trait FamilyRunner: Send + Sync {
    async fn run_family(&self, family: NetworkFamily, servers: &[ServerDescriptor]) -> Result<MeasurementRecord>;
}

/// Barrier between the two family runs
#[async_trait]
pub trait Cooldown: Send + Sync {
    async fn wait(&self);
}

/// Sleeps for a fixed duration
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown(pub Duration);

impl Default for FixedCooldown {
    fn default() -> Self {
        FixedCooldown(crate::defaults::DEFAULT_COOLDOWN)
    }
}

#[async_trait]
impl Cooldown for FixedCooldown {
    async fn wait(&self) {
        tokio::time::sleep(self.0).await;
    }
}

/// What the orchestrator knows about one family before it runs
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyPlan {
    pub family: NetworkFamily,
    /// False when the family was found unreachable or was not requested
    pub available: bool,
    pub servers: Vec<ServerDescriptor>,
}

impl FamilyPlan {
    pub fn available(family: NetworkFamily, servers: Vec<ServerDescriptor>) -> Self {
        Self {
            family,
            available: true,
            servers,
        }
    }

    pub fn unavailable(family: NetworkFamily) -> Self {
        Self {
            family,
            available: false,
            servers: Vec::new(),
        }
    }
}

/// Runs both families in preference order, never letting one family's
/// failure abort the other
pub struct DualStackOrchestrator {
    runner: Arc<dyn FamilyRunner>,
    cooldown: Arc<dyn Cooldown>,
    logger: MeasurementLogger,
}

impl DualStackOrchestrator {
    pub fn new(runner: Arc<dyn FamilyRunner>, cooldown: Arc<dyn Cooldown>) -> Self {
        Self {
            runner,
            cooldown,
            logger: MeasurementLogger::disabled(),
        }
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Run the families IPv4 then IPv6, or IPv6 first when `prefer_ipv6`.
    /// The cooldown is awaited exactly once, between the two attempts.
    pub async fn run(&self, prefer_ipv6: bool, plans: &[FamilyPlan]) -> ResultPair {
        let mut results = ResultPair::new();

        for (position, family) in NetworkFamily::ordered(prefer_ipv6).into_iter().enumerate() {
            if position > 0 {
                self.cooldown.wait().await;
            }

            let plan = plans.iter().find(|p| p.family == family && p.available);
            let Some(plan) = plan else {
                self.logger.log_family_skipped(family).await;
                results.set(family, None);
                continue;
            };

            match self.runner.run_family(family, &plan.servers).await {
                Ok(record) => {
                    self.logger.log_family_outcome(family, Ok(&record)).await;
                    results.set(family, Some(record));
                }
                Err(error) => {
                    self.logger.log_family_outcome(family, Err(&error)).await;
                    results.set(family, None);
                }
            }
        }

        results
    }
}

//! Concurrent single-sample latency probing of candidate servers
//!
//! A fixed pool of workers drains a job queue holding one [`PingJob`] per
//! candidate. Every job yields exactly one [`ProbeOutcome`], so the caller
//! stops collecting after a countdown of the candidate count rather than
//! waiting on a separate completion signal.

use crate::{
    backend::{MeasurementBackend, PingRequest},
    defaults::PROBE_WORKERS,
    error::{AppError, Result},
    logging::MeasurementLogger,
    models::{PingJob, PingResult, ProbeOutcome, ServerDescriptor, SkipReason},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fans latency probes out over a fixed-width worker pool
pub struct LatencyProbe {
    backend: Arc<dyn MeasurementBackend>,
    workers: usize,
    logger: MeasurementLogger,
}

impl LatencyProbe {
    pub fn new(backend: Arc<dyn MeasurementBackend>) -> Self {
        Self {
            backend,
            workers: PROBE_WORKERS,
            logger: MeasurementLogger::disabled(),
        }
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Override the pool width (at least one worker)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Probe every candidate and return one outcome per candidate, in
    /// completion order
    pub async fn probe_all(&self, servers: &[ServerDescriptor], request: &PingRequest) -> Vec<ProbeOutcome> {
        let total = servers.len();
        if total == 0 {
            return Vec::new();
        }

        let (job_tx, job_rx) = async_channel::bounded(total);
        for (index, server) in servers.iter().cloned().enumerate() {
            // capacity equals the job count, so this never waits
            if job_tx.send(PingJob { index, server }).await.is_err() {
                break;
            }
        }
        job_tx.close();

        let (result_tx, mut result_rx) = mpsc::channel(total);
        for _ in 0..self.workers {
            tokio::spawn(probe_worker(
                job_rx.clone(),
                result_tx.clone(),
                self.backend.clone(),
                request.clone(),
            ));
        }
        drop(result_tx);

        let mut outcomes = Vec::with_capacity(total);
        let mut remaining = total;
        while remaining > 0 {
            match result_rx.recv().await {
                Some(outcome) => {
                    outcomes.push(outcome);
                    remaining -= 1;
                }
                // every worker is gone; a panicked worker loses its job
                None => break,
            }
        }
        outcomes
    }

    /// Latency per responding candidate index.
    ///
    /// Fails with [`AppError::NoReachableServer`] when no candidate produced
    /// a latency.
    pub async fn measure(&self, servers: &[ServerDescriptor], request: &PingRequest) -> Result<BTreeMap<usize, f64>> {
        let family = request.family;
        let outcomes = self.probe_all(servers, request).await;

        let mut latencies = BTreeMap::new();
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Measured(PingResult { index, latency_ms }) => {
                    self.logger.log_probe_result(family, &servers[index], latency_ms).await;
                    latencies.insert(index, latency_ms);
                }
                ProbeOutcome::Skipped { index, reason } => {
                    self.logger.log_probe_skip(family, &servers[index], &reason).await;
                }
            }
        }
        self.logger.log_probe_round(family, servers.len(), latencies.len()).await;

        if latencies.is_empty() {
            return Err(AppError::no_reachable_server(format!(
                "none of {} {} servers responded",
                servers.len(),
                family
            )));
        }
        Ok(latencies)
    }
}

async fn probe_worker(
    jobs: async_channel::Receiver<PingJob>,
    results: mpsc::Sender<ProbeOutcome>,
    backend: Arc<dyn MeasurementBackend>,
    request: PingRequest,
) {
    while let Ok(job) = jobs.recv().await {
        let outcome = probe_one(backend.as_ref(), &job, &request).await;
        if results.send(outcome).await.is_err() {
            break;
        }
    }
}

/// Liveness check followed by a single latency sample
async fn probe_one(backend: &dyn MeasurementBackend, job: &PingJob, request: &PingRequest) -> ProbeOutcome {
    let skipped = |reason| ProbeOutcome::Skipped {
        index: job.index,
        reason,
    };

    if let Err(e) = job.server.ping_url() {
        return skipped(SkipReason::InvalidUrl(e.to_string()));
    }
    if !backend.is_up(&job.server).await {
        return skipped(SkipReason::NotResponding);
    }

    match backend.ping_and_jitter(&job.server, request).await {
        Ok(summary) if summary.latency_ms > 0.0 => ProbeOutcome::Measured(PingResult {
            index: job.index,
            latency_ms: summary.latency_ms,
        }),
        Ok(_) => skipped(SkipReason::NonPositiveLatency),
        Err(e) => skipped(SkipReason::ProbeFailed(e.to_string())),
    }
}

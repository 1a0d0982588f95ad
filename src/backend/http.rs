//! reqwest-backed measurement primitives

use super::{ActivityLog, MeasurementBackend, MeasurementSettings, PingRequest, SystemPing, ThroughputSample};
use crate::{
    error::{AppError, ErrorContext, Result},
    models::ServerDescriptor,
    stats::{latency_summary, LatencySummary},
    types::NetworkFamily,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{future::try_join_all, Future, StreamExt};
use rand::Rng;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use url::Url;

/// Measurement backend for one address family
pub struct HttpBackend {
    client: Client,
    family: NetworkFamily,
    probe_timeout: Duration,
    pinger: SystemPing,
}

impl HttpBackend {
    /// `client` should already be pinned to `family`
    pub fn new(client: Client, family: NetworkFamily, probe_timeout: Duration) -> Self {
        Self {
            client,
            family,
            probe_timeout,
            pinger: SystemPing::new(),
        }
    }

    pub fn with_pinger(mut self, pinger: SystemPing) -> Self {
        self.pinger = pinger;
        self
    }

    pub fn family(&self) -> NetworkFamily {
        self.family
    }

    /// Time `count` GETs of the ping URL, in milliseconds
    async fn http_samples(&self, url: &Url, count: u32) -> Result<Vec<f64>> {
        let mut samples = Vec::with_capacity(count as usize);
        for _ in 0..count.max(1) {
            let start = Instant::now();
            let response = self
                .client
                .get(url.clone())
                .timeout(self.probe_timeout)
                .send()
                .await?
                .error_for_status()?;
            response.bytes().await?;
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(samples)
    }
}

#[async_trait]
impl MeasurementBackend for HttpBackend {
    async fn is_up(&self, server: &ServerDescriptor) -> bool {
        let Ok(url) = server.ping_url() else {
            return false;
        };

        match self.client.get(url).timeout(self.probe_timeout).send().await {
            Ok(response) => {
                let status_ok = response.status() == StatusCode::OK;
                match response.bytes().await {
                    Ok(body) => status_ok && body.is_empty(),
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    async fn ping_and_jitter(&self, server: &ServerDescriptor, request: &PingRequest) -> Result<LatencySummary> {
        if request.use_icmp {
            let samples = self
                .pinger
                .sample(&server.host(), request.count, request.family, request.source.as_ref())
                .await?;
            return latency_summary(&samples, false);
        }

        let url = server.ping_url()?;
        let samples = self
            .http_samples(&url, request.count)
            .await
            .with_context(|| format!("HTTP ping of {}", server.host()))?;
        // The first HTTP sample includes connection setup
        latency_summary(&samples, true)
    }

    async fn download(
        &self,
        server: &ServerDescriptor,
        settings: &MeasurementSettings,
        log: &ActivityLog,
    ) -> Result<ThroughputSample> {
        let url = server.download_url(settings.chunks)?;
        let counter = Arc::new(AtomicU64::new(0));
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + settings.duration;

        let streams = (0..settings.concurrency.max(1)).map(|stream| {
            let fut = download_stream(self.client.clone(), url.clone(), counter.clone());
            run_stream("download", stream, deadline, log, fut)
        });
        try_join_all(streams)
            .await
            .map_err(|e| AppError::measurement(format!("Download from {} failed: {}", server.host(), e)))?;

        finish_phase("download", settings, counter.load(Ordering::Relaxed), start.elapsed(), log)
    }

    async fn upload(
        &self,
        server: &ServerDescriptor,
        settings: &MeasurementSettings,
        log: &ActivityLog,
    ) -> Result<ThroughputSample> {
        let url = server.upload_url()?;
        let payload = UploadPayload::new(settings.upload_size_kib as usize * 1024, settings.pre_allocate);
        let counter = Arc::new(AtomicU64::new(0));
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + settings.duration;

        let streams = (0..settings.concurrency.max(1)).map(|stream| {
            let fut = upload_stream(self.client.clone(), url.clone(), payload.clone(), counter.clone());
            run_stream("upload", stream, deadline, log, fut)
        });
        try_join_all(streams)
            .await
            .map_err(|e| AppError::measurement(format!("Upload to {} failed: {}", server.host(), e)))?;

        finish_phase("upload", settings, counter.load(Ordering::Relaxed), start.elapsed(), log)
    }
}

/// Drive one stream until the phase deadline; reaching the deadline is the
/// normal way a stream ends
async fn run_stream<F>(
    phase: &str,
    stream: u32,
    deadline: tokio::time::Instant,
    log: &ActivityLog,
    fut: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    log.record(format!("{} stream {} started", phase, stream));
    let outcome = match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Ok(()),
    };
    match &outcome {
        Ok(()) => log.record(format!("{} stream {} finished", phase, stream)),
        Err(e) => log.record(format!("{} stream {} failed: {}", phase, stream, e)),
    }
    outcome
}

fn finish_phase(
    phase: &str,
    settings: &MeasurementSettings,
    bytes: u64,
    elapsed: Duration,
    log: &ActivityLog,
) -> Result<ThroughputSample> {
    if bytes == 0 {
        log.record(format!("{} transferred no data", phase));
        return Err(AppError::measurement(format!("The {} phase transferred no data", phase)));
    }
    let rate = settings.unit.rate(bytes, elapsed);
    log.record(format!(
        "{}: {} bytes in {:.2}s, {} {}",
        phase,
        bytes,
        elapsed.as_secs_f64(),
        rate,
        settings.unit.label()
    ));
    Ok(ThroughputSample { rate, bytes })
}

async fn download_stream(client: Client, url: Url, counter: Arc<AtomicU64>) -> Result<()> {
    loop {
        let response = client.get(url.clone()).send().await?.error_for_status()?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            counter.fetch_add(chunk?.len() as u64, Ordering::Relaxed);
        }
    }
}

async fn upload_stream(client: Client, url: Url, payload: UploadPayload, counter: Arc<AtomicU64>) -> Result<()> {
    loop {
        let body = payload.body();
        let len = body.len() as u64;
        client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        counter.fetch_add(len, Ordering::Relaxed);
    }
}

/// Upload body source: one shared random buffer, or a fresh one per request
#[derive(Clone)]
enum UploadPayload {
    Shared(Bytes),
    Fresh(usize),
}

impl UploadPayload {
    fn new(len: usize, pre_allocate: bool) -> Self {
        if pre_allocate {
            UploadPayload::Shared(Bytes::from(random_bytes(len)))
        } else {
            UploadPayload::Fresh(len)
        }
    }

    fn body(&self) -> Bytes {
        match self {
            UploadPayload::Shared(bytes) => bytes.clone(),
            UploadPayload::Fresh(len) => Bytes::from(random_bytes(*len)),
        }
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes
}

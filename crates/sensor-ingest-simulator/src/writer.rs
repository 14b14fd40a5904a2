//! HTTP client posting ingest payloads.

use crate::error::Result;
use crate::payload::IngestPayload;
use crate::tasks::TaskKind;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server returned error: {status} - {body}")]
    ServerError { status: u16, body: String },
}

/// How the ingestion service answered a successful request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Body `ok`: the device was recognized
    Accepted,
    /// Body `nok`: the device lookup failed
    Rejected,
    /// Any other 2xx body
    Other,
}

impl IngestOutcome {
    pub fn from_body(body: &str) -> Self {
        match body.trim() {
            "ok" => IngestOutcome::Accepted,
            "nok" => IngestOutcome::Rejected,
            _ => IngestOutcome::Other,
        }
    }
}

/// Per-task request counters.
#[derive(Debug, Default)]
pub struct TaskCounters {
    pub requests: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    pub errors: AtomicU64,
}

/// Statistics for ingest requests.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub known_device: TaskCounters,
    pub unknown_device: TaskCounters,
    pub bytes_sent: AtomicU64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self, task: TaskKind) -> &TaskCounters {
        match task {
            TaskKind::KnownDevice => &self.known_device,
            TaskKind::UnknownDevice => &self.unknown_device,
        }
    }

    pub fn record_success(&self, task: TaskKind, outcome: IngestOutcome, bytes: u64) {
        let counters = self.counters(task);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        match outcome {
            IngestOutcome::Accepted => counters.accepted.fetch_add(1, Ordering::Relaxed),
            IngestOutcome::Rejected => counters.rejected.fetch_add(1, Ordering::Relaxed),
            IngestOutcome::Other => 0,
        };
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_error(&self, task: TaskKind) {
        let counters = self.counters(task);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        counters.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.known_device.requests.load(Ordering::Relaxed)
            + self.unknown_device.requests.load(Ordering::Relaxed)
    }
}

/// Latency recording channels per task kind.
#[derive(Clone)]
pub struct LatencySenders {
    pub known_device: mpsc::UnboundedSender<Duration>,
    pub unknown_device: mpsc::UnboundedSender<Duration>,
}

impl LatencySenders {
    fn send(&self, task: TaskKind, latency: Duration) {
        let sender = match task {
            TaskKind::KnownDevice => &self.known_device,
            TaskKind::UnknownDevice => &self.unknown_device,
        };
        let _ = sender.send(latency);
    }
}

/// Client that sends payloads to `POST /ingest`.
#[derive(Clone)]
pub struct IngestClient {
    client: reqwest::Client,
    ingest_url: String,
}

impl IngestClient {
    pub fn new(ingest_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            ingest_url: ingest_url.into(),
        })
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }

    /// Posts one payload. No retries; the caller moves on either way.
    pub async fn send(&self, payload: &IngestPayload) -> std::result::Result<SendReport, IngestError> {
        // Payload types always serialize.
        let body = serde_json::to_vec(payload).unwrap_or_default();
        let bytes = body.len() as u64;

        let start = Instant::now();
        let response = self
            .client
            .post(&self.ingest_url)
            .header(ACCEPT, "text/plain")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let latency = start.elapsed();

        if status.is_success() {
            Ok(SendReport {
                outcome: IngestOutcome::from_body(&text),
                latency,
                bytes,
            })
        } else {
            Err(IngestError::ServerError {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

/// Result of one successful POST.
#[derive(Debug, Clone, Copy)]
pub struct SendReport {
    pub outcome: IngestOutcome,
    pub latency: Duration,
    pub bytes: u64,
}

/// Sends a payload and records its outcome and latency.
pub async fn send_and_record(
    client: &IngestClient,
    task: TaskKind,
    payload: &IngestPayload,
    stats: &IngestStats,
    latencies: &LatencySenders,
) -> std::result::Result<IngestOutcome, IngestError> {
    match client.send(payload).await {
        Ok(report) => {
            stats.record_success(task, report.outcome, report.bytes);
            latencies.send(task, report.latency);
            Ok(report.outcome)
        }
        Err(e) => {
            stats.record_error(task);
            Err(e)
        }
    }
}

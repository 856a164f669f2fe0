//! Strom public facade.
//!
//! This crate defines the stable traits and types the status transport
//! (HTTP endpoint, CLI) depends on: the collaborator boundaries around the
//! supervisor, the assembly routine its poll loop runs, and the feed that
//! hands finalized reports to concurrent readers.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

// Re-export the core report types the transport layer consumes.
pub use strom_core::{
    Offset, PartitionId, PartitionLag, PartitionOffsets, ReportError, StreamStatusPayload,
    StreamStatusReport, SupervisorReport, TaskPhase, TaskReportRecord,
};

/// API errors suitable for transport to remote status clients.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum StromError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type StromResult<T> = Result<T, StromError>;

impl StromError {
    /// Wrap a collaborator failure for transport.
    pub fn internal(e: anyhow::Error) -> Self {
        StromError::Internal(e.to_string())
    }
}

impl From<ReportError> for StromError {
    fn from(e: ReportError) -> Self {
        StromError::Validation(e.to_string())
    }
}

/// Ingestion configuration echoed into every status payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSpec {
    pub data_source: String,
    pub topic: String,
    pub partitions: i32,
    pub replicas: i32,
}

/// Offset/lag figures supplied by the message-log client poller.
///
/// Fields are independently optional; `Default` is the nothing-known-yet
/// window right after supervisor start. This crate stores the values as
/// given and never computes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OffsetTelemetry {
    pub latest_offsets: Option<PartitionOffsets>,
    pub minimum_lag: Option<PartitionLag>,
    pub aggregate_lag: Option<i64>,
    pub offsets_last_updated: Option<DateTime<Utc>>,
}

/// Source of finalized status reports; what the transport layer consumes.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// Latest status snapshot for the supervised datasource.
    async fn status(&self) -> StromResult<StreamStatusReport>;
}

/// Message-log client boundary: offset telemetry for the supervised topic.
#[async_trait::async_trait]
pub trait OffsetReader: Send + Sync {
    /// Highest available offset per partition.
    async fn latest_offsets(&self) -> StromResult<PartitionOffsets>;
}

/// Build one finalized status report for a poll cycle.
///
/// Appends `tasks` in enumeration order; an unknown task phase aborts the
/// whole assembly so a half-filed roster never escapes.
pub fn assemble_status(
    spec: &IngestSpec,
    generation_time: DateTime<Utc>,
    duration_seconds: i64,
    tasks: impl IntoIterator<Item = TaskReportRecord>,
    telemetry: OffsetTelemetry,
) -> StromResult<StreamStatusReport> {
    let t0 = Instant::now();
    info!(data_source = %spec.data_source, topic = %spec.topic, "status: assemble start");
    let mut report = StreamStatusReport::new(
        &spec.data_source,
        generation_time,
        &spec.topic,
        spec.partitions,
        spec.replicas,
        duration_seconds,
        telemetry.latest_offsets,
        telemetry.minimum_lag,
        telemetry.aggregate_lag,
        telemetry.offsets_last_updated,
    );
    for record in tasks {
        report.append_task(record)?;
    }
    let payload = report.payload();
    info!(
        active = payload.active_tasks().len(),
        publishing = payload.publishing_tasks().len(),
        took_ms = %t0.elapsed().as_millis(),
        "status: assemble ok"
    );
    histogram!("status_assemble_ms", t0.elapsed().as_secs_f64() * 1000.0);
    counter!("status_reports_total", 1u64);
    Ok(report)
}

// ----------------- Status feed -----------------

/// Writer half of the latest-report cell; owned by the supervisor's poll
/// loop, one publish per cycle. Published reports are never mutated again.
pub struct StatusFeed {
    cell: Arc<ArcSwapOption<StreamStatusReport>>,
    epoch_tx: watch::Sender<u64>,
    epoch: u64,
}

/// Reader half: cheap to clone, hands out the latest finalized report.
#[derive(Clone)]
pub struct FeedHandle {
    cell: Arc<ArcSwapOption<StreamStatusReport>>,
    epoch_rx: watch::Receiver<u64>,
}

/// Create a connected feed pair. `current()` is `None` until the first
/// publish.
pub fn status_feed() -> (StatusFeed, FeedHandle) {
    let cell = Arc::new(ArcSwapOption::empty());
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    (
        StatusFeed { cell: Arc::clone(&cell), epoch_tx, epoch: 0 },
        FeedHandle { cell, epoch_rx },
    )
}

impl StatusFeed {
    pub fn publish(&mut self, report: StreamStatusReport) {
        self.cell.store(Some(Arc::new(report)));
        self.epoch += 1;
        let _ = self.epoch_tx.send(self.epoch);
        counter!("status_published_total", 1u64);
    }
}

impl FeedHandle {
    pub fn current(&self) -> Option<Arc<StreamStatusReport>> {
        self.cell.load_full()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }
}

#[async_trait::async_trait]
impl StatusSource for FeedHandle {
    async fn status(&self) -> StromResult<StreamStatusReport> {
        self.current()
            .map(|r| (*r).clone())
            .ok_or_else(|| StromError::NotFound("no report published yet".into()))
    }
}

// ----------------- Mock implementation -----------------

/// Fixed-report mock for tests.
#[derive(Default)]
pub struct MockStatusSource {
    pub report: Option<StreamStatusReport>,
}

impl MockStatusSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StatusSource for MockStatusSource {
    async fn status(&self) -> StromResult<StreamStatusReport> {
        self.report.clone().ok_or_else(|| StromError::NotFound("no report".into()))
    }
}

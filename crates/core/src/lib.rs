//! Strom core report types and errors.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Partition id within the source topic.
pub type PartitionId = i32;
/// Partition-local sequence position.
pub type Offset = i64;

/// Per-partition offsets. BTreeMap keeps renderings and wire output stable.
pub type PartitionOffsets = BTreeMap<PartitionId, Offset>;
/// Per-partition message lag.
pub type PartitionLag = BTreeMap<PartitionId, i64>;

/// Lifecycle phase of an ingestion task as published in status reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPhase {
    /// Consuming from assigned partitions.
    Active,
    /// Stopped consuming; handing accumulated data off for durable storage.
    Publishing,
    /// Phase tag this build does not know (report from a newer supervisor).
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskPhase::Active => "ACTIVE",
            TaskPhase::Publishing => "PUBLISHING",
            TaskPhase::Unknown => "UNKNOWN",
        })
    }
}

/// Errors raised while filling a report.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    /// The record's phase tag matches no roster.
    #[error("unknown task type [{0}]")]
    UnknownTaskType(TaskPhase),
}

/// Progress snapshot of one ingestion task.
///
/// Produced by the supervisor's task bookkeeping; this crate only files it
/// into rosters and serializes it. Offset fields are omitted from the wire
/// form when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskReportRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub phase: TaskPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_offsets: Option<PartitionOffsets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_offsets: Option<PartitionOffsets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds until the task hits its run limit and moves to publishing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
}

impl TaskReportRecord {
    pub fn new(id: &str, phase: TaskPhase) -> Self {
        Self {
            id: id.to_string(),
            phase,
            starting_offsets: None,
            current_offsets: None,
            start_time: None,
            remaining_seconds: None,
        }
    }
}

impl fmt::Display for TaskReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{id='{}', type={}", self.id, self.phase)?;
        if let Some(so) = &self.starting_offsets {
            write!(f, ", startingOffsets={:?}", so)?;
        }
        if let Some(co) = &self.current_offsets {
            write!(f, ", currentOffsets={:?}", co)?;
        }
        if let Some(st) = &self.start_time {
            write!(f, ", startTime={}", st.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        if let Some(rs) = self.remaining_seconds {
            write!(f, ", remainingSeconds={}", rs)?;
        }
        f.write_str("}")
    }
}

/// Status payload for one datasource ingesting from a partitioned topic.
///
/// Created by [`SupervisorReport::new`] with empty rosters; the only
/// mutation afterwards is roster append via
/// [`SupervisorReport::append_task`]. The four offset/lag fields are
/// independently optional and omitted entirely from the wire form when
/// absent — unknown lag is not zero lag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatusPayload {
    data_source: String,
    topic: String,
    partitions: i32,
    replicas: i32,
    duration_seconds: i64,
    active_tasks: Vec<TaskReportRecord>,
    publishing_tasks: Vec<TaskReportRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latest_offsets: Option<PartitionOffsets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_lag: Option<PartitionLag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregate_lag: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offsets_last_updated: Option<DateTime<Utc>>,
}

impl StreamStatusPayload {
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partitions(&self) -> i32 {
        self.partitions
    }

    pub fn replicas(&self) -> i32 {
        self.replicas
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }

    /// Tasks currently consuming, in append order.
    pub fn active_tasks(&self) -> &[TaskReportRecord] {
        &self.active_tasks
    }

    /// Tasks handing off data, in append order.
    pub fn publishing_tasks(&self) -> &[TaskReportRecord] {
        &self.publishing_tasks
    }

    pub fn latest_offsets(&self) -> Option<&PartitionOffsets> {
        self.latest_offsets.as_ref()
    }

    pub fn minimum_lag(&self) -> Option<&PartitionLag> {
        self.minimum_lag.as_ref()
    }

    pub fn aggregate_lag(&self) -> Option<i64> {
        self.aggregate_lag
    }

    pub fn offsets_last_updated(&self) -> Option<DateTime<Utc>> {
        self.offsets_last_updated
    }
}

impl fmt::Display for StreamStatusPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{dataSource='{}', topic='{}', partitions={}, replicas={}, durationSeconds={}, active=",
            self.data_source, self.topic, self.partitions, self.replicas, self.duration_seconds
        )?;
        write_tasks(f, &self.active_tasks)?;
        f.write_str(", publishing=")?;
        write_tasks(f, &self.publishing_tasks)?;
        if let Some(lo) = &self.latest_offsets {
            write!(f, ", latestOffsets={:?}", lo)?;
        }
        if let Some(ml) = &self.minimum_lag {
            write!(f, ", minimumLag={:?}", ml)?;
        }
        if let Some(al) = self.aggregate_lag {
            write!(f, ", aggregateLag={}", al)?;
        }
        if let Some(ts) = &self.offsets_last_updated {
            write!(f, ", offsetsLastUpdated={}", ts.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        f.write_str("}")
    }
}

fn write_tasks(f: &mut fmt::Formatter<'_>, tasks: &[TaskReportRecord]) -> fmt::Result {
    f.write_str("[")?;
    for (i, t) in tasks.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", t)?;
    }
    f.write_str("]")
}

/// Generic supervisor report envelope: an identifying name, a generation
/// timestamp fixed at construction, and a payload supplied per supervisor
/// kind.
///
/// For the stream payload the envelope id and the payload's `dataSource`
/// come from the same constructor argument, so they cannot diverge. A
/// hand-built wire document carrying differing values is a misuse on the
/// producer's side; deserialization does not correct it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorReport<P> {
    id: String,
    generation_time: DateTime<Utc>,
    payload: P,
}

/// The envelope specialized to stream-ingestion status.
pub type StreamStatusReport = SupervisorReport<StreamStatusPayload>;

impl<P> SupervisorReport<P> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn generation_time(&self) -> DateTime<Utc> {
        self.generation_time
    }

    /// Read access for serialization. Callers must not mutate the payload
    /// outside [`SupervisorReport::append_task`].
    pub fn payload(&self) -> &P {
        &self.payload
    }
}

impl SupervisorReport<StreamStatusPayload> {
    /// New report with empty rosters. Telemetry arguments default to absent
    /// at call sites that have not heard from the message-log client yet.
    pub fn new(
        data_source: &str,
        generation_time: DateTime<Utc>,
        topic: &str,
        partitions: i32,
        replicas: i32,
        duration_seconds: i64,
        latest_offsets: Option<PartitionOffsets>,
        minimum_lag: Option<PartitionLag>,
        aggregate_lag: Option<i64>,
        offsets_last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: data_source.to_string(),
            generation_time,
            payload: StreamStatusPayload {
                data_source: data_source.to_string(),
                topic: topic.to_string(),
                partitions,
                replicas,
                duration_seconds,
                active_tasks: Vec::new(),
                publishing_tasks: Vec::new(),
                latest_offsets,
                minimum_lag,
                aggregate_lag,
                offsets_last_updated,
            },
        }
    }

    /// File `record` into the roster matching its phase, preserving call
    /// order. `Unknown` is refused rather than mis-filed: a silently dropped
    /// task would corrupt the status picture operators rely on.
    pub fn append_task(&mut self, record: TaskReportRecord) -> Result<(), ReportError> {
        match record.phase {
            TaskPhase::Active => self.payload.active_tasks.push(record),
            TaskPhase::Publishing => self.payload.publishing_tasks.push(record),
            TaskPhase::Unknown => return Err(ReportError::UnknownTaskType(record.phase)),
        }
        Ok(())
    }
}

impl<P: fmt::Display> fmt::Display for SupervisorReport<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{id='{}', generationTime={}, payload={}}}",
            self.id,
            self.generation_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.payload
        )
    }
}

#![forbid(unsafe_code)]

use chrono::{DateTime, TimeZone, Utc};
use strom_core::{
    ReportError, StreamStatusReport, TaskPhase, TaskReportRecord,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

fn report() -> StreamStatusReport {
    StreamStatusReport::new("wiki", t0(), "wiki-topic", 4, 2, 3600, None, None, None, None)
}

#[test]
fn new_report_has_empty_rosters() {
    let r = report();
    assert_eq!(r.id(), "wiki");
    assert_eq!(r.generation_time(), t0());
    let p = r.payload();
    assert_eq!(p.data_source(), r.id());
    assert_eq!(p.topic(), "wiki-topic");
    assert_eq!(p.partitions(), 4);
    assert_eq!(p.replicas(), 2);
    assert_eq!(p.duration_seconds(), 3600);
    assert!(p.active_tasks().is_empty());
    assert!(p.publishing_tasks().is_empty());
    assert!(p.latest_offsets().is_none());
    assert!(p.minimum_lag().is_none());
    assert!(p.aggregate_lag().is_none());
    assert!(p.offsets_last_updated().is_none());
}

#[test]
fn append_files_by_phase_preserving_order() {
    let mut r = report();
    r.append_task(TaskReportRecord::new("a-0", TaskPhase::Active)).unwrap();
    r.append_task(TaskReportRecord::new("p-0", TaskPhase::Publishing)).unwrap();
    r.append_task(TaskReportRecord::new("a-1", TaskPhase::Active)).unwrap();
    r.append_task(TaskReportRecord::new("p-1", TaskPhase::Publishing)).unwrap();
    r.append_task(TaskReportRecord::new("a-2", TaskPhase::Active)).unwrap();

    let active: Vec<&str> = r.payload().active_tasks().iter().map(|t| t.id.as_str()).collect();
    let publishing: Vec<&str> =
        r.payload().publishing_tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(active, ["a-0", "a-1", "a-2"]);
    assert_eq!(publishing, ["p-0", "p-1"]);
}

#[test]
fn append_unknown_phase_errors_and_leaves_rosters_unchanged() {
    let mut r = report();
    r.append_task(TaskReportRecord::new("a-0", TaskPhase::Active)).unwrap();

    let err = r
        .append_task(TaskReportRecord::new("mystery", TaskPhase::Unknown))
        .unwrap_err();
    assert_eq!(err, ReportError::UnknownTaskType(TaskPhase::Unknown));
    assert_eq!(err.to_string(), "unknown task type [UNKNOWN]");

    assert_eq!(r.payload().active_tasks().len(), 1);
    assert!(r.payload().publishing_tasks().is_empty());
}

#[test]
fn wiki_example_scenario() {
    // Construct("wiki", t0, "wiki-topic", 4, 2, 3600); append one ACTIVE,
    // one PUBLISHING; all telemetry stays absent.
    let mut r = report();
    r.append_task(TaskReportRecord::new("task-1", TaskPhase::Active)).unwrap();
    r.append_task(TaskReportRecord::new("task-2", TaskPhase::Publishing)).unwrap();

    let p = r.payload();
    assert_eq!(p.active_tasks().len(), 1);
    assert_eq!(p.active_tasks()[0].id, "task-1");
    assert_eq!(p.publishing_tasks().len(), 1);
    assert_eq!(p.publishing_tasks()[0].id, "task-2");
    assert!(p.latest_offsets().is_none());
    assert!(p.minimum_lag().is_none());
    assert!(p.aggregate_lag().is_none());
    assert!(p.offsets_last_updated().is_none());
}

#[test]
fn display_omits_absent_telemetry() {
    let mut r = report();
    r.append_task(TaskReportRecord::new("task-1", TaskPhase::Active)).unwrap();

    let s = r.to_string();
    assert_eq!(
        s,
        "{id='wiki', generationTime=2020-01-01T00:00:00.000Z, payload=\
         {dataSource='wiki', topic='wiki-topic', partitions=4, replicas=2, \
         durationSeconds=3600, active=[{id='task-1', type=ACTIVE}], publishing=[]}}"
    );
}

#[test]
fn display_renders_telemetry_when_present() {
    let latest = [(0, 100i64), (1, 200)].into_iter().collect();
    let lag = [(0, 5i64), (1, 0)].into_iter().collect();
    let r = StreamStatusReport::new(
        "wiki",
        t0(),
        "wiki-topic",
        2,
        1,
        60,
        Some(latest),
        Some(lag),
        Some(5),
        Some(t0()),
    );

    let s = r.to_string();
    assert!(s.contains("latestOffsets={0: 100, 1: 200}"), "{s}");
    assert!(s.contains("minimumLag={0: 5, 1: 0}"), "{s}");
    assert!(s.contains("aggregateLag=5"), "{s}");
    assert!(s.contains("offsetsLastUpdated=2020-01-01T00:00:00.000Z"), "{s}");
}

#[test]
fn record_display_includes_progress_fields_when_present() {
    let mut rec = TaskReportRecord::new("task-1", TaskPhase::Publishing);
    assert_eq!(rec.to_string(), "{id='task-1', type=PUBLISHING}");

    rec.starting_offsets = Some([(0, 5i64)].into_iter().collect());
    rec.current_offsets = Some([(0, 9i64)].into_iter().collect());
    rec.remaining_seconds = Some(42);
    assert_eq!(
        rec.to_string(),
        "{id='task-1', type=PUBLISHING, startingOffsets={0: 5}, currentOffsets={0: 9}, remainingSeconds=42}"
    );
}

//! Integration tests for the fetch-align-write pipeline.
//!
//! Both remote sources are replaced by in-memory sources that serve canned
//! points per window, so these tests cover chunking, partial failure,
//! alignment, classification and the output file end to end.

use chrono::{DateTime, TimeDelta, Utc};
use dvolwatch_core::data::{DataError, RawPoint, SeriesSource, TimeWindow, TimestampUnit};
use dvolwatch_runner::{read_summary, run_pipeline, Config, PipelineError};
use std::cell::Cell;
use std::path::Path;

const NOW_S: i64 = 1_700_100_000;
const DAY_S: i64 = 86_400;

struct CannedSource {
    name: &'static str,
    unit: TimestampUnit,
    max_window: Option<TimeDelta>,
    points: Vec<RawPoint>,
    fail_calls: Vec<usize>,
    calls: Cell<usize>,
}

impl CannedSource {
    /// Volatility-like source: millisecond timestamps, chunked.
    fn volatility(points: &[(i64, f64)], max_window_days: i64) -> Self {
        Self {
            name: "canned_dvol",
            unit: TimestampUnit::Millis,
            max_window: Some(TimeDelta::days(max_window_days)),
            points: points
                .iter()
                .map(|&(s, v)| RawPoint::new(s * 1000, v))
                .collect(),
            fail_calls: Vec::new(),
            calls: Cell::new(0),
        }
    }

    /// Price-like source: second timestamps, single window.
    fn price(points: &[(i64, f64)]) -> Self {
        Self {
            name: "canned_price",
            unit: TimestampUnit::Seconds,
            max_window: None,
            points: points.iter().map(|&(s, v)| RawPoint::new(s, v)).collect(),
            fail_calls: Vec::new(),
            calls: Cell::new(0),
        }
    }

    fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_calls = calls.to_vec();
        self
    }
}

impl SeriesSource for CannedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn unit(&self) -> TimestampUnit {
        self.unit
    }

    fn max_window(&self) -> Option<TimeDelta> {
        self.max_window
    }

    fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<RawPoint>, DataError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if self.fail_calls.contains(&call) {
            return Err(DataError::HttpStatus {
                source_name: self.name.to_string(),
                status: 502,
            });
        }
        let lo = self.unit.to_timestamp(window.start);
        let hi = self.unit.to_timestamp(window.end);
        Ok(self
            .points
            .iter()
            .filter(|p| p.timestamp >= lo && p.timestamp <= hi)
            .copied()
            .collect())
    }
}

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW_S, 0).unwrap()
}

fn config(output: &Path, lookback_days: u32) -> Config {
    Config {
        output_path: output.to_path_buf(),
        lookback_days,
        ..Config::default()
    }
}

/// `days` consecutive daily points ending one day before `NOW_S`.
fn daily(days: i64, value: impl Fn(i64) -> f64) -> Vec<(i64, f64)> {
    (1..=days).map(|d| (NOW_S - d * DAY_S, value(d))).collect()
}

#[test]
fn single_common_day_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    let vol = CannedSource::volatility(&[(1_700_000_000, 55.0)], 365);
    let price = CannedSource::price(&[(1_700_000_000, 60000.12)]);

    let report = run_pipeline(&config(&out, 365), &vol, &price, None, now()).unwrap();

    assert_eq!(report.record.dates.len(), 1);
    assert_eq!(report.record.current_dvol, 55.0);
    assert_eq!(report.record.status, "보통");
    assert_eq!(report.record.status_en, "Normal");
    assert_eq!(report.record.expected_daily_move, 2.88);
    assert_eq!(report.output_path, out);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["dates"], serde_json::json!(["2023-11-14"]));
    assert_eq!(json["btc_prices"], serde_json::json!([60000.12]));
    assert_eq!(json["dvol"], serde_json::json!([55.0]));
    assert_eq!(json["current_price"], 60000.12);
    assert_eq!(json["last_updated"], "2023-11-16T02:00:00.000000Z");
}

#[test]
fn latest_dvol_at_high_threshold_is_high() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    // d = 1 is the most recent day.
    let vol = CannedSource::volatility(&daily(5, |d| if d == 1 { 60.0 } else { 50.0 }), 365);
    let price = CannedSource::price(&daily(5, |d| 30_000.0 + d as f64));

    let report = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap();
    assert_eq!(report.record.current_dvol, 60.0);
    assert_eq!(report.record.status_en, "High Volatility");
    assert_eq!(report.record.status, "과변동성");
    assert_eq!(report.record.current_price, 30_001.0);
}

#[test]
fn no_overlap_aborts_without_touching_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");
    std::fs::write(&out, "previous run").unwrap();

    let vol = CannedSource::volatility(&[(NOW_S - 10 * DAY_S, 50.0)], 365);
    let price = CannedSource::price(&[(NOW_S - 3 * DAY_S, 30_000.0)]);

    let err = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::NoOverlap {
            volatility_points: 1,
            price_points: 1
        }
    ));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous run");
}

#[test]
fn failed_chunk_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    // 30 days in 10-day chunks; the middle chunk fails.
    let vol = CannedSource::volatility(&daily(29, |d| 40.0 + d as f64), 10).failing_on(&[1]);
    let price = CannedSource::price(&daily(29, |d| 30_000.0 + d as f64));

    let report = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap();

    assert_eq!(report.volatility_chunks, (3, 1));
    assert_eq!(report.price_chunks, (1, 0));
    // Days 11..=19 were only in the failed chunk.
    assert_eq!(report.record.dates.len(), 29 - 9);
    assert_eq!(report.record.current_dvol, 41.0);
    assert!(out.exists());
}

#[test]
fn all_chunks_failing_names_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    let vol = CannedSource::volatility(&daily(29, |_| 50.0), 10).failing_on(&[0, 1, 2]);
    let price = CannedSource::price(&daily(29, |_| 30_000.0));

    let err = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap_err();
    match err {
        PipelineError::Fetch { source_name, error } => {
            assert_eq!(source_name, "canned_dvol");
            assert!(matches!(error, DataError::NoData { failed: 3, total: 3, .. }));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
    assert_eq!(price.calls.get(), 1);
    assert!(!out.exists());
}

#[test]
fn both_failing_sources_are_requested_and_volatility_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    let vol = CannedSource::volatility(&daily(5, |_| 50.0), 365).failing_on(&[0]);
    let price = CannedSource::price(&daily(5, |_| 30_000.0)).failing_on(&[0]);

    let err = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap_err();
    assert!(err.to_string().contains("canned_dvol"));
    assert_eq!(vol.calls.get(), 1);
    assert_eq!(price.calls.get(), 1);
    assert!(!out.exists());
}

#[test]
fn empty_price_source_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");

    let vol = CannedSource::volatility(&daily(5, |_| 50.0), 365);
    let price = CannedSource::price(&[]);

    let err = run_pipeline(&config(&out, 30), &vol, &price, None, now()).unwrap_err();
    assert!(err.to_string().contains("canned_price"));
    assert!(!out.exists());
}

#[test]
fn rerun_differs_only_in_last_updated() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data.json");
    let cfg = config(&out, 30);

    let vol = CannedSource::volatility(&daily(20, |d| 45.0 + d as f64 / 3.0), 10);
    let price = CannedSource::price(&daily(20, |d| 30_000.0 + d as f64 * 7.777));

    let first = run_pipeline(&cfg, &vol, &price, None, now()).unwrap();
    let first_file = read_summary(&out).unwrap();

    let later = now() + TimeDelta::seconds(5);
    let second = run_pipeline(&cfg, &vol, &price, None, later).unwrap();
    let second_file = read_summary(&out).unwrap();

    assert_ne!(first.record.last_updated, second.record.last_updated);
    assert_eq!(first.record.without_timestamp(), second.record.without_timestamp());
    assert_eq!(first_file.without_timestamp(), second_file.without_timestamp());
    assert_eq!(second_file, second.record);
}

//! Chunked series fetcher.
//!
//! Splits a requested span into windows no wider than the source allows,
//! working backward from `end`, fetches each window, and merges the chunk
//! results into one deduplicated, time-ordered point list.
//!
//! A failed or empty chunk is reported and skipped. The fetch as a whole
//! fails only when nothing usable came back.

use super::provider::{DataError, RawPoint, RawSeries, SeriesSource, TimeWindow, TimestampUnit};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Result of one chunk request.
#[derive(Debug)]
pub enum ChunkOutcome {
    Fetched {
        window: TimeWindow,
        points: Vec<RawPoint>,
    },
    Failed {
        window: TimeWindow,
        error: DataError,
    },
}

impl ChunkOutcome {
    pub fn window(&self) -> &TimeWindow {
        match self {
            ChunkOutcome::Fetched { window, .. } | ChunkOutcome::Failed { window, .. } => window,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ChunkOutcome::Failed { .. })
    }

    /// Points returned by this chunk; empty for a failed chunk.
    pub fn points(&self) -> &[RawPoint] {
        match self {
            ChunkOutcome::Fetched { points, .. } => points,
            ChunkOutcome::Failed { .. } => &[],
        }
    }

    /// First and last UTC date actually present in the chunk's points.
    pub fn covered_dates(&self, unit: TimestampUnit) -> Option<(NaiveDate, NaiveDate)> {
        let points = self.points();
        let min = points.iter().map(|p| p.timestamp).min()?;
        let max = points.iter().map(|p| p.timestamp).max()?;
        Some((
            unit.to_datetime(min)?.date_naive(),
            unit.to_datetime(max)?.date_naive(),
        ))
    }
}

/// A successfully fetched series plus chunk bookkeeping.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub series: RawSeries,
    pub chunks_total: usize,
    pub chunks_failed: usize,
}

/// Progress callback for chunked fetches.
pub trait FetchProgress {
    /// Called before a chunk request is sent.
    fn on_chunk_start(&self, source: &str, window: &TimeWindow, index: usize, total: usize);

    /// Called when a chunk request finishes, successfully or not.
    fn on_chunk_complete(
        &self,
        source: &str,
        unit: TimestampUnit,
        outcome: &ChunkOutcome,
        index: usize,
        total: usize,
    );

    /// Called once all chunks for a source have been merged.
    fn on_fetch_complete(&self, source: &str, points: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_chunk_start(&self, source: &str, window: &TimeWindow, index: usize, total: usize) {
        debug!("[{}/{}] {source}: requesting {window}", index + 1, total);
    }

    fn on_chunk_complete(
        &self,
        source: &str,
        unit: TimestampUnit,
        outcome: &ChunkOutcome,
        index: usize,
        total: usize,
    ) {
        let n = index + 1;
        let window = outcome.window();
        match outcome {
            ChunkOutcome::Fetched { points, .. } if points.is_empty() => {
                warn!("[{n}/{total}] {source}: no points for {window}, skipping chunk");
            }
            ChunkOutcome::Fetched { points, .. } => match outcome.covered_dates(unit) {
                Some((first, last)) => {
                    info!("[{n}/{total}] {source}: {} points, {first} to {last}", points.len())
                }
                None => info!("[{n}/{total}] {source}: {} points", points.len()),
            },
            ChunkOutcome::Failed { error, .. } => {
                warn!("[{n}/{total}] {source}: request for {window} failed, skipping chunk: {error}");
            }
        }
    }

    fn on_fetch_complete(&self, source: &str, points: usize, failed: usize, total: usize) {
        if failed > 0 {
            info!("{source}: {points} points after merge ({failed}/{total} chunks failed)");
        } else {
            info!("{source}: {points} points after merge");
        }
    }
}

/// Split `[end - span, end]` into windows of at most `max_window`, newest first.
///
/// Adjacent windows share only their boundary instant. A non-positive span
/// yields no windows; an absent or non-positive `max_window` yields one.
/// A span reaching past the earliest representable instant is clamped there.
pub fn plan_windows(
    end: DateTime<Utc>,
    span: TimeDelta,
    max_window: Option<TimeDelta>,
) -> Vec<TimeWindow> {
    if span <= TimeDelta::zero() {
        return Vec::new();
    }
    let start = end
        .checked_sub_signed(span)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let step = match max_window {
        Some(w) if w > TimeDelta::zero() => w,
        _ => return vec![TimeWindow::new(start, end)],
    };

    let mut windows = Vec::new();
    let mut chunk_end = end;
    while chunk_end > start {
        let chunk_start = chunk_end
            .checked_sub_signed(step)
            .map_or(start, |s| s.max(start));
        windows.push(TimeWindow::new(chunk_start, chunk_end));
        chunk_end = chunk_start;
    }
    windows
}

/// Request every window in order, capturing each result as a [`ChunkOutcome`].
pub fn fetch_chunks(
    source: &dyn SeriesSource,
    windows: &[TimeWindow],
    progress: Option<&dyn FetchProgress>,
) -> Vec<ChunkOutcome> {
    let total = windows.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, window) in windows.iter().enumerate() {
        if let Some(p) = progress {
            p.on_chunk_start(source.name(), window, i, total);
        }

        let outcome = match source.fetch_window(window) {
            Ok(points) => ChunkOutcome::Fetched {
                window: *window,
                points,
            },
            Err(error) => ChunkOutcome::Failed {
                window: *window,
                error,
            },
        };

        if let Some(p) = progress {
            p.on_chunk_complete(source.name(), source.unit(), &outcome, i, total);
        }
        outcomes.push(outcome);
    }

    outcomes
}

/// Merge chunk results: one point per timestamp, first seen wins, ascending.
pub fn merge_chunks(outcomes: &[ChunkOutcome]) -> Vec<RawPoint> {
    let mut by_timestamp: BTreeMap<i64, f64> = BTreeMap::new();
    for point in outcomes.iter().flat_map(|o| o.points()) {
        by_timestamp.entry(point.timestamp).or_insert(point.value);
    }
    by_timestamp
        .into_iter()
        .map(|(timestamp, value)| RawPoint { timestamp, value })
        .collect()
}

/// Fetch `[end - span, end]` from `source`, chunking as the source requires.
///
/// Returns [`DataError::NoData`] when every chunk failed or the merged
/// result is empty.
pub fn fetch_series(
    source: &dyn SeriesSource,
    end: DateTime<Utc>,
    span: TimeDelta,
    progress: Option<&dyn FetchProgress>,
) -> Result<FetchedSeries, DataError> {
    let windows = plan_windows(end, span, source.max_window());
    let outcomes = fetch_chunks(source, &windows, progress);

    let chunks_total = outcomes.len();
    let chunks_failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let points = merge_chunks(&outcomes);

    if let Some(p) = progress {
        p.on_fetch_complete(source.name(), points.len(), chunks_failed, chunks_total);
    }

    if points.is_empty() {
        return Err(DataError::NoData {
            source_name: source.name().to_string(),
            failed: chunks_failed,
            total: chunks_total,
        });
    }

    Ok(FetchedSeries {
        series: RawSeries::new(source.name(), source.unit(), points),
        chunks_total,
        chunks_failed,
    })
}

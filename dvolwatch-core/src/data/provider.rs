//! Series source trait and structured error types.
//!
//! The SeriesSource trait abstracts over the remote APIs (Deribit DVOL,
//! blockchain.com market price) so the fetcher can chunk requests against
//! any of them and tests can swap in in-memory sources.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use thiserror::Error;

/// A timestamped scalar exactly as one source reported it.
///
/// `timestamp` is an epoch value in the source's native unit; see
/// [`TimestampUnit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl RawPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Epoch unit a source uses for its timestamps.
///
/// Both units are interpreted as UTC. A source that reports local time would
/// align against the wrong day; nothing here tries to detect that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Millis,
    Seconds,
}

impl TimestampUnit {
    /// Convert a raw timestamp to a UTC instant. `None` if out of range.
    pub fn to_datetime(self, timestamp: i64) -> Option<DateTime<Utc>> {
        match self {
            TimestampUnit::Millis => DateTime::from_timestamp_millis(timestamp),
            TimestampUnit::Seconds => DateTime::from_timestamp(timestamp, 0),
        }
    }

    /// Convert a UTC instant to a raw timestamp in this unit.
    pub fn to_timestamp(self, at: DateTime<Utc>) -> i64 {
        match self {
            TimestampUnit::Millis => at.timestamp_millis(),
            TimestampUnit::Seconds => at.timestamp(),
        }
    }
}

/// Points from one source plus the unit needed to interpret them.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub source: String,
    pub unit: TimestampUnit,
    pub points: Vec<RawPoint>,
}

impl RawSeries {
    pub fn new(source: impl Into<String>, unit: TimestampUnit, points: Vec<RawPoint>) -> Self {
        Self {
            source: source.into(),
            unit,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A closed time interval `[start, end]` requested from a source in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Structured error types for remote data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {source_name}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("no data from '{source_name}' ({failed}/{total} chunk requests failed)")]
    NoData {
        source_name: String,
        failed: usize,
        total: usize,
    },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// A remote series that can be queried one bounded window at a time.
///
/// Implementations only translate a window into a request and the response
/// into points. Chunking, deduplication and ordering live in the fetcher.
pub trait SeriesSource {
    /// Human-readable name of this source, used in logs and errors.
    fn name(&self) -> &str;

    /// Epoch unit of the timestamps this source returns.
    fn unit(&self) -> TimestampUnit;

    /// Longest span a single request may cover. `None` means unbounded.
    fn max_window(&self) -> Option<TimeDelta>;

    /// Fetch the points inside one window.
    fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<RawPoint>, DataError>;
}

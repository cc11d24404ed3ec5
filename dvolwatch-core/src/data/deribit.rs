//! Deribit volatility index (DVOL) source.
//!
//! Queries `public/get_volatility_index_data`, which returns OHLC candles of
//! the index as `[timestamp_ms, open, high, low, close]` rows. The close is
//! the value we keep. Deribit caps how much history one request may span,
//! so this source advertises a maximum window and the fetcher chunks.

use super::http::get_json;
use super::provider::{DataError, RawPoint, SeriesSource, TimeWindow, TimestampUnit};
use chrono::TimeDelta;
use serde::Deserialize;
use tracing::warn;

pub const DERIBIT_BASE_URL: &str = "https://www.deribit.com/api/v2";

/// Index of the close field inside a candle row.
const CLOSE_INDEX: usize = 4;

/// JSON-RPC envelope returned by Deribit.
#[derive(Debug, Deserialize)]
struct DvolEnvelope {
    result: Option<DvolResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct DvolResult {
    data: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Deribit DVOL source for one currency.
pub struct DeribitDvolSource {
    client: reqwest::blocking::Client,
    base_url: String,
    currency: String,
    resolution: String,
    max_window: TimeDelta,
}

impl DeribitDvolSource {
    pub fn new(client: reqwest::blocking::Client, currency: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DERIBIT_BASE_URL.to_string(),
            currency: currency.into(),
            resolution: "1D".to_string(),
            max_window: TimeDelta::days(365),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    pub fn with_max_window(mut self, max_window: TimeDelta) -> Self {
        self.max_window = max_window;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/public/get_volatility_index_data",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Parse the JSON-RPC envelope into points, skipping malformed rows.
    fn parse_response(&self, envelope: DvolEnvelope) -> Result<Vec<RawPoint>, DataError> {
        if let Some(err) = envelope.error {
            return Err(DataError::Remote {
                code: err.code,
                message: err.message,
            });
        }

        let rows = envelope
            .result
            .and_then(|r| r.data)
            .ok_or_else(|| DataError::ResponseFormatChanged("no data in DVOL response".into()))?;

        let mut skipped = 0usize;
        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            let timestamp = row.first().copied().flatten();
            let close = row.get(CLOSE_INDEX).copied().flatten();
            match (timestamp, close) {
                (Some(ts), Some(close)) if ts.is_finite() && close.is_finite() => {
                    points.push(RawPoint::new(ts as i64, close));
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                source = self.name(),
                skipped, "skipped DVOL rows without a timestamp or close"
            );
        }

        Ok(points)
    }
}

impl SeriesSource for DeribitDvolSource {
    fn name(&self) -> &str {
        "deribit_dvol"
    }

    fn unit(&self) -> TimestampUnit {
        TimestampUnit::Millis
    }

    fn max_window(&self) -> Option<TimeDelta> {
        Some(self.max_window)
    }

    fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<RawPoint>, DataError> {
        let query = [
            ("currency", self.currency.clone()),
            ("resolution", self.resolution.clone()),
            ("start_timestamp", window.start.timestamp_millis().to_string()),
            ("end_timestamp", window.end.timestamp_millis().to_string()),
        ];
        let envelope: DvolEnvelope = get_json(&self.client, self.name(), &self.endpoint(), &query)?;
        self.parse_response(envelope)
    }
}

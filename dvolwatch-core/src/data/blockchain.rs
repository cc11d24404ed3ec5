//! blockchain.com market price source.
//!
//! The charts API takes a timespan measured back from now rather than
//! explicit bounds, so this source has no window limit and the fetcher
//! always asks it for a single window ending at the present.

use super::http::get_json;
use super::provider::{DataError, RawPoint, SeriesSource, TimeWindow, TimestampUnit};
use chrono::TimeDelta;
use serde::Deserialize;

pub const BLOCKCHAIN_BASE_URL: &str = "https://api.blockchain.info";

#[derive(Debug, Deserialize)]
struct PriceEnvelope {
    status: Option<String>,
    values: Option<Vec<PricePoint>>,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    x: f64,
    y: f64,
}

/// BTC/USD market price from blockchain.com.
pub struct BlockchainPriceSource {
    client: reqwest::blocking::Client,
    base_url: String,
    chart: String,
    sampled: bool,
}

impl BlockchainPriceSource {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            base_url: BLOCKCHAIN_BASE_URL.to_string(),
            chart: "market-price".to_string(),
            sampled: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_sampled(mut self, sampled: bool) -> Self {
        self.sampled = sampled;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/charts/{}", self.base_url.trim_end_matches('/'), self.chart)
    }

    /// Timespan descriptor covering `span`, rounded up to whole days.
    fn timespan(span: TimeDelta) -> String {
        let secs = span.num_seconds().max(0);
        let days = ((secs + 86_399) / 86_400).max(1);
        format!("{days}days")
    }

    fn parse_response(envelope: PriceEnvelope) -> Result<Vec<RawPoint>, DataError> {
        if let Some(status) = envelope.status.as_deref() {
            if status != "ok" {
                return Err(DataError::ResponseFormatChanged(format!(
                    "price chart status '{status}'"
                )));
            }
        }

        let values = envelope
            .values
            .ok_or_else(|| DataError::ResponseFormatChanged("no values in price response".into()))?;

        Ok(values
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .map(|p| RawPoint::new(p.x as i64, p.y))
            .collect())
    }
}

impl SeriesSource for BlockchainPriceSource {
    fn name(&self) -> &str {
        "blockchain_price"
    }

    fn unit(&self) -> TimestampUnit {
        TimestampUnit::Seconds
    }

    fn max_window(&self) -> Option<TimeDelta> {
        None
    }

    fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<RawPoint>, DataError> {
        let query = [
            ("timespan", Self::timespan(window.span())),
            ("format", "json".to_string()),
            ("sampled", self.sampled.to_string()),
        ];
        let envelope: PriceEnvelope = get_json(&self.client, self.name(), &self.endpoint(), &query)?;
        Self::parse_response(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Vec<RawPoint>, DataError> {
        BlockchainPriceSource::parse_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn parses_xy_values() {
        let points = parse(
            r#"{"status":"ok","name":"Market Price (USD)","unit":"USD","period":"day",
                "values":[{"x":1700000000,"y":60000.12},{"x":1700086400,"y":61000.5}]}"#,
        )
        .unwrap();
        assert_eq!(
            points,
            vec![
                RawPoint::new(1_700_000_000, 60000.12),
                RawPoint::new(1_700_086_400, 61000.5),
            ]
        );
    }

    #[test]
    fn non_ok_status_is_error() {
        let err = parse(r#"{"status":"not-found","values":[]}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn missing_values_is_error() {
        let err = parse(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn timespan_rounds_up_to_days() {
        assert_eq!(BlockchainPriceSource::timespan(TimeDelta::days(365)), "365days");
        assert_eq!(
            BlockchainPriceSource::timespan(TimeDelta::days(2) + TimeDelta::hours(1)),
            "3days"
        );
        assert_eq!(BlockchainPriceSource::timespan(TimeDelta::zero()), "1days");
    }

    #[test]
    fn unbounded_window_in_seconds() {
        let src = BlockchainPriceSource::new(reqwest::blocking::Client::new());
        assert_eq!(src.unit(), TimestampUnit::Seconds);
        assert!(src.max_window().is_none());
        assert_eq!(src.endpoint(), "https://api.blockchain.info/charts/market-price");
    }
}

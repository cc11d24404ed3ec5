//! Summary record built from an aligned series.
//!
//! Takes the most recent common day, classifies the volatility level, and
//! converts the annualized DVOL figure into an implied one-day move.

use crate::data::align::{round2, AlignedSeries, DateKey};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// sqrt(365), rounded. Divides an annualized volatility into a one-day move.
pub const DAILY_MOVE_DIVISOR: f64 = 19.1;

#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error("cannot summarize an empty aligned series")]
    EmptySeries,
}

/// Volatility regime of the latest DVOL reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

impl VolatilityRegime {
    /// Localized (Korean) label shown on the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            VolatilityRegime::Low => "저변동성",
            VolatilityRegime::Normal => "보통",
            VolatilityRegime::High => "과변동성",
        }
    }

    /// Stable English tag.
    pub fn tag(&self) -> &'static str {
        match self {
            VolatilityRegime::Low => "Low Volatility",
            VolatilityRegime::Normal => "Normal",
            VolatilityRegime::High => "High Volatility",
        }
    }
}

/// Inclusive classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityBands {
    pub low: f64,
    pub high: f64,
}

impl Default for VolatilityBands {
    fn default() -> Self {
        Self {
            low: 40.0,
            high: 60.0,
        }
    }
}

impl VolatilityBands {
    /// `>= high` is High, `<= low` is Low, anything else (NaN included) is Normal.
    pub fn classify(&self, dvol: f64) -> VolatilityRegime {
        if dvol >= self.high {
            VolatilityRegime::High
        } else if dvol <= self.low {
            VolatilityRegime::Low
        } else {
            VolatilityRegime::Normal
        }
    }
}

/// Implied one-day move in percent, rounded to two decimals.
pub fn expected_daily_move(dvol: f64) -> f64 {
    round2(dvol / DAILY_MOVE_DIVISOR)
}

/// The persisted output record.
///
/// `dates`, `btc_prices` and `dvol` are parallel and always the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub dates: Vec<DateKey>,
    pub btc_prices: Vec<f64>,
    pub dvol: Vec<f64>,
    pub current_price: f64,
    pub current_dvol: f64,
    pub expected_daily_move: f64,
    pub status: String,
    pub status_en: String,
    pub last_updated: String,
}

impl SummaryRecord {
    /// Copy of the record with `last_updated` blanked, for comparing runs.
    pub fn without_timestamp(&self) -> SummaryRecord {
        SummaryRecord {
            last_updated: String::new(),
            ..self.clone()
        }
    }
}

/// Build the output record from a non-empty aligned series.
pub fn build_summary(
    aligned: &AlignedSeries,
    bands: &VolatilityBands,
    generated_at: DateTime<Utc>,
) -> Result<SummaryRecord, SummaryError> {
    let latest = aligned.latest().ok_or(SummaryError::EmptySeries)?;
    let regime = bands.classify(latest.volatility);

    Ok(SummaryRecord {
        dates: aligned.dates(),
        btc_prices: aligned.prices(),
        dvol: aligned.volatility(),
        current_price: latest.price,
        current_dvol: latest.volatility,
        expected_daily_move: expected_daily_move(latest.volatility),
        status: regime.label().to_string(),
        status_en: regime.tag().to_string(),
        last_updated: generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

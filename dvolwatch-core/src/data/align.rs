//! Date alignment of two raw series.
//!
//! Each series is keyed by UTC calendar day, then the two are inner-joined:
//! only days present in both survive. Days missing from either side are
//! dropped rather than filled.

use super::provider::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// UTC calendar day used as the join key, rendered `YYYY-MM-DD`.
///
/// Ordering is chronological, which matches lexicographic order of the
/// rendered form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_FORMAT).map(DateKey::new)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One joined day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPoint {
    pub date: DateKey,
    pub volatility: f64,
    pub price: f64,
}

/// Inner join of the volatility and price series, ascending by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    rows: Vec<AlignedPoint>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent common day.
    pub fn latest(&self) -> Option<&AlignedPoint> {
        self.rows.last()
    }

    pub fn dates(&self) -> Vec<DateKey> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn volatility(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.volatility).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price).collect()
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Key a series by UTC day. A later point on the same day replaces an earlier one.
pub fn index_by_date(series: &RawSeries) -> BTreeMap<DateKey, f64> {
    let mut by_date = BTreeMap::new();
    let mut skipped = 0usize;
    for point in &series.points {
        match series.unit.to_datetime(point.timestamp) {
            Some(at) => {
                by_date.insert(DateKey::new(at.date_naive()), point.value);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            source = %series.source,
            skipped, "skipped points with out-of-range timestamps"
        );
    }
    by_date
}

/// Inner-join two series by UTC day, rounding both values to two decimals.
///
/// An empty input or an empty intersection gives an empty series; callers
/// check [`AlignedSeries::is_empty`] before summarizing.
pub fn align_series(volatility: &RawSeries, price: &RawSeries) -> AlignedSeries {
    let vol_by_date = index_by_date(volatility);
    let price_by_date = index_by_date(price);

    let rows = vol_by_date
        .iter()
        .filter_map(|(date, vol)| {
            price_by_date.get(date).map(|price| AlignedPoint {
                date: *date,
                volatility: round2(*vol),
                price: round2(*price),
            })
        })
        .collect();

    AlignedSeries { rows }
}

//! DVOL Watch Core — series sources, chunked fetcher, date aligner, summary builder.
//!
//! This crate contains everything between the remote APIs and the output
//! record:
//! - `SeriesSource` trait with Deribit DVOL and blockchain.com price sources
//! - Chunked fetching with per-chunk outcomes, dedup and ordering
//! - UTC-day inner join of the two series
//! - Regime classification and implied daily move

pub mod data;
pub mod summary;

pub use summary::{build_summary, SummaryError, SummaryRecord, VolatilityBands, VolatilityRegime};

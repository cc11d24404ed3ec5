//! One fetch-align-write pass.
//!
//! Fetch volatility, fetch price, align by UTC day, summarize, persist.
//! Any no-data condition aborts the run before the output file is touched.

use crate::config::Config;
use crate::output::{write_summary, PersistError};
use chrono::{DateTime, Utc};
use dvolwatch_core::data::{
    align_series, build_client, fetch_series, BlockchainPriceSource, DataError,
    DeribitDvolSource, FetchProgress, FetchedSeries, SeriesSource,
};
use dvolwatch_core::{build_summary, SummaryError, SummaryRecord};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch {source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: DataError,
    },

    #[error(
        "no common dates between volatility ({volatility_points} points) \
         and price ({price_points} points)"
    )]
    NoOverlap {
        volatility_points: usize,
        price_points: usize,
    },

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// The two live sources, built from config.
pub struct Sources {
    pub volatility: DeribitDvolSource,
    pub price: BlockchainPriceSource,
}

impl Sources {
    pub fn from_config(config: &Config) -> Result<Self, DataError> {
        let client = build_client(config.timeout(), &config.http.user_agent)?;

        let volatility = DeribitDvolSource::new(client.clone(), config.volatility.currency.clone())
            .with_base_url(config.volatility.base_url.clone())
            .with_resolution(config.volatility.resolution.clone())
            .with_max_window(config.max_window());

        let price = BlockchainPriceSource::new(client)
            .with_base_url(config.price.base_url.clone())
            .with_sampled(config.price.sampled);

        Ok(Self { volatility, price })
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub record: SummaryRecord,
    pub output_path: PathBuf,
    /// `(total, failed)` chunk requests per source.
    pub volatility_chunks: (usize, usize),
    pub price_chunks: (usize, usize),
}

fn fetch(
    source: &dyn SeriesSource,
    config: &Config,
    now: DateTime<Utc>,
    progress: Option<&dyn FetchProgress>,
) -> Result<FetchedSeries, PipelineError> {
    info!("fetching {} ({} days)", source.name(), config.lookback_days);
    fetch_series(source, now, config.lookback(), progress).map_err(|error| {
        warn!("failed to fetch {}: {error}", source.name());
        PipelineError::Fetch {
            source_name: source.name().to_string(),
            error,
        }
    })
}

/// Run the whole pipeline and write `config.output_path`.
///
/// `now` is both the end of the requested span and the record's
/// `last_updated` stamp.
pub fn run_pipeline(
    config: &Config,
    volatility: &dyn SeriesSource,
    price: &dyn SeriesSource,
    progress: Option<&dyn FetchProgress>,
    now: DateTime<Utc>,
) -> Result<RunReport, PipelineError> {
    // Both sources are requested before either error is propagated.
    let vol = fetch(volatility, config, now, progress);
    let px = fetch(price, config, now, progress);
    let (vol, px) = (vol?, px?);

    let aligned = align_series(&vol.series, &px.series);
    info!("found {} common dates", aligned.len());
    if aligned.is_empty() {
        return Err(PipelineError::NoOverlap {
            volatility_points: vol.series.len(),
            price_points: px.series.len(),
        });
    }

    let record = build_summary(&aligned, &config.bands, now)?;
    write_summary(&config.output_path, &record)?;
    info!("saved {}", config.output_path.display());

    Ok(RunReport {
        record,
        output_path: config.output_path.clone(),
        volatility_chunks: (vol.chunks_total, vol.chunks_failed),
        price_chunks: (px.chunks_total, px.chunks_failed),
    })
}

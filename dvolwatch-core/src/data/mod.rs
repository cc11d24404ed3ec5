//! Remote series sources, chunked fetching and date alignment

pub mod align;
pub mod blockchain;
pub mod deribit;
pub mod fetcher;
pub mod http;
pub mod provider;

pub use align::{align_series, AlignedPoint, AlignedSeries, DateKey};
pub use blockchain::BlockchainPriceSource;
pub use deribit::DeribitDvolSource;
pub use fetcher::{fetch_series, ChunkOutcome, FetchProgress, FetchedSeries, LogProgress};
pub use http::build_client;
pub use provider::{DataError, RawPoint, RawSeries, SeriesSource, TimeWindow, TimestampUnit};

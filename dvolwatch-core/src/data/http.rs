//! Shared blocking HTTP plumbing for the remote sources.
//!
//! One request, one response. There is no retry loop: a failed request
//! surfaces as a [`DataError`] and the fetcher decides what to skip.

use super::provider::DataError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("dvolwatch/", env!("CARGO_PKG_VERSION"));

/// Build the blocking client shared by all sources.
pub fn build_client(
    timeout: Duration,
    user_agent: &str,
) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| DataError::Client(e.to_string()))
}

/// GET `url` with `query` and decode the JSON body into `T`.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    source_name: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, DataError> {
    debug!(source = source_name, url, ?query, "GET");

    let resp = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

    let status = resp.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(DataError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        return Err(DataError::HttpStatus {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }

    resp.json::<T>().map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response from {source_name}: {e}"))
    })
}

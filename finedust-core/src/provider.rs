use std::{convert::TryFrom, fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    error::AirQualityError,
    model::{Coordinate, StationReport, WeatherReading},
};

pub mod airkorea;
pub mod openweather;

/// Per-call timeout for upstream requests.
pub(crate) const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(300);

/// How the pollution provider resolves a coordinate to a station.
/// Exactly one strategy is used per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationStrategy {
    /// Ask the nearest-station endpoint and take the first hit.
    Nearby,
    /// Query every region, then pick the closest station by Manhattan distance.
    BulkScan,
}

impl StationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStrategy::Nearby => "nearby",
            StationStrategy::BulkScan => "bulk-scan",
        }
    }

    pub const fn all() -> &'static [StationStrategy] {
        &[StationStrategy::Nearby, StationStrategy::BulkScan]
    }
}

impl std::fmt::Display for StationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StationStrategy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nearby" => Ok(StationStrategy::Nearby),
            "bulk-scan" => Ok(StationStrategy::BulkScan),
            _ => Err(anyhow::anyhow!(
                "Unknown station strategy '{value}'. Supported strategies: nearby, bulk-scan."
            )),
        }
    }
}

/// Resolves a coordinate to a monitoring station and its latest reading.
#[async_trait]
pub trait PollutionProvider: Send + Sync + Debug {
    async fn fetch_pollution(
        &self,
        coordinate: &Coordinate,
    ) -> Result<StationReport, AirQualityError>;
}

/// Fetches current weather for a coordinate. Callers may treat failures as
/// non-fatal; the service downgrades them and omits weather fields.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_weather(
        &self,
        coordinate: &Coordinate,
    ) -> Result<WeatherReading, AirQualityError>;
}

/// Shared HTTP client with the upstream timeout applied.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Classify a transport-level failure: timeouts get their own error kind so
/// the caller can tell them apart from other upstream trouble.
pub(crate) fn upstream_error(err: reqwest::Error, what: &str) -> AirQualityError {
    if err.is_timeout() {
        AirQualityError::UpstreamTimeout(what.to_string())
    } else {
        AirQualityError::Internal(
            anyhow::Error::new(err).context(format!("request to {what} failed")),
        )
    }
}

/// GET a JSON document with one bounded retry for transient failures.
/// Timeouts are not retried; the 8s budget has already been spent once.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    what: &str,
) -> Result<T, AirQualityError> {
    let mut attempt = 1;
    loop {
        match try_get_json(client, url, query, what).await {
            Ok(value) => return Ok(value),
            Err(err)
                if attempt < MAX_ATTEMPTS
                    && matches!(err, AirQualityError::Internal(_)) =>
            {
                tracing::warn!("{what} attempt {attempt}/{MAX_ATTEMPTS} failed: {err}");
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn try_get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    what: &str,
) -> Result<T, AirQualityError> {
    let res = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|err| upstream_error(err, what))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|err| upstream_error(err, what))?;

    if !status.is_success() {
        return Err(AirQualityError::Internal(anyhow::anyhow!(
            "{what} request failed with status {status}: {}",
            truncate_body(&body),
        )));
    }

    serde_json::from_str(&body).map_err(|err| {
        AirQualityError::Internal(
            anyhow::Error::new(err).context(format!("failed to parse {what} JSON")),
        )
    })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    // Char-based so multibyte payloads never split mid-character.
    match body.char_indices().nth(MAX) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_as_str_roundtrip() {
        for strategy in StationStrategy::all() {
            let s = strategy.as_str();
            let parsed = StationStrategy::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*strategy, parsed);
        }
    }

    #[test]
    fn unknown_strategy_error() {
        let err = StationStrategy::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown station strategy"));
    }

    #[test]
    fn strategy_parsing_is_case_insensitive() {
        assert_eq!(
            StationStrategy::try_from("Bulk-Scan").unwrap(),
            StationStrategy::BulkScan
        );
    }

    #[test]
    fn truncate_body_caps_long_payloads() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert!(truncated.len() < long.len());
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_body("short"), "short");
    }
}

/// Precipitation service client.
///
/// Fetches mean daily precipitation over a region from the rainfall
/// service, one record per calendar day in millimetres, reduced
/// server-side over the region polygon. Records are sorted by date on the
/// way in; days the service has no value for are simply absent.

use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use crate::catalog::RainfallSource;
use crate::ingest::{DEFAULT_TIMEOUT_SECS, transport_error};
use crate::model::{CatalogError, RainfallRecord};
use crate::regions::Region;

/// Environment variable naming the precipitation service base URL.
pub const RAIN_URL_ENV: &str = "FLOODMAP_RAIN_URL";

#[derive(Debug, Deserialize)]
struct RainfallResponse {
    records: Vec<RainfallPayload>,
}

#[derive(Debug, Deserialize)]
struct RainfallPayload {
    date: NaiveDate,
    rain_mm: f64,
}

/// Blocking client for the precipitation service.
pub struct RainServiceClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl RainServiceClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Build the client from `FLOODMAP_RAIN_URL`, honoring the
    /// `FLOODMAP_TIMEOUT_SECS` override.
    pub fn from_env() -> Result<Self, CatalogError> {
        let base = std::env::var(RAIN_URL_ENV)
            .map_err(|_| CatalogError::Unavailable(format!("{} is not set", RAIN_URL_ENV)))?;
        Self::with_timeout(&base, crate::ingest::timeout_from_env())
    }
}

impl RainfallSource for RainServiceClient {
    fn mean_daily_precipitation(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
        scale_m: f64,
    ) -> Result<Vec<RainfallRecord>, CatalogError> {
        let (min_lon, min_lat, max_lon, max_lat) = region.bounding_box();
        let url = format!(
            "{}/daily_mean?min_lon={}&min_lat={}&max_lon={}&max_lat={}&start={}&end={}&scale={}",
            self.base_url, min_lon, min_lat, max_lon, max_lat, start, end, scale_m
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http(status.as_u16()));
        }
        let body = response
            .text()
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        parse_rainfall(&body)
    }
}

/// Parse a rainfall body into date-sorted records.
pub fn parse_rainfall(body: &str) -> Result<Vec<RainfallRecord>, CatalogError> {
    let parsed: RainfallResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;

    let mut records: Vec<RainfallRecord> = parsed
        .records
        .into_iter()
        .map(|r| RainfallRecord { date: r.date, rain_mm: r.rain_mm })
        .collect();
    records.sort_by_key(|r| r.date);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_rainfall_sorts_by_date() {
        let records = parse_rainfall(fixtures::fixture_rainfall()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, d("2024-01-01"));
        assert_eq!(records[2].date, d("2024-01-03"));
        assert_eq!(records[2].rain_mm, 25.5);
    }

    #[test]
    fn test_parse_rainfall_empty() {
        let records = parse_rainfall(r#"{"records":[]}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_rainfall_malformed() {
        let err = parse_rainfall(r#"{"records":[{"date":"nope","rain_mm":1}]}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}

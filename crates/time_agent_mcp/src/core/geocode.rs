use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::error::{TimeAgentError, TimeAgentResult};

pub const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// First geocoding match for a city query
#[derive(Debug, Clone, Deserialize)]
pub struct GeoMatch {
    /// Display name as resolved by the provider
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name for the location
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<GeoMatch>,
}

/// Resolves a free-text city name to coordinates and timezone metadata
#[async_trait]
pub trait CityLocator: Send + Sync {
    /// Look up a city by name. One lookup per call; no caching.
    async fn locate(&self, city: &str) -> TimeAgentResult<GeoMatch>;
}

/// Geocoding client backed by the Open-Meteo search API
#[derive(Debug, Clone)]
pub struct GeoClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeoClient {
    pub fn new() -> Self {
        Self::with_base_url(GEOCODING_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self { http, base_url }
    }
}

impl Default for GeoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CityLocator for GeoClient {
    async fn locate(&self, city: &str) -> TimeAgentResult<GeoMatch> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TimeAgentError::Provider {
                message: format!("geocoding failed: HTTP {}", status.as_u16()),
            });
        }

        let body = response.text().await?;
        first_match(&body, city)
    }
}

/// Extract the first match from a geocoding response body
fn first_match(body: &str, city: &str) -> TimeAgentResult<GeoMatch> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| TimeAgentError::Provider {
            message: format!("malformed geocoding response: {e}"),
        })?;

    parsed
        .results
        .into_iter()
        .next()
        .ok_or_else(|| TimeAgentError::CityNotFound {
            city: city.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::{CityLocator, GeoMatch};
    use crate::core::error::{TimeAgentError, TimeAgentResult};

    /// Fixed city table standing in for the geocoding provider
    pub(crate) struct StaticLocator {
        entries: HashMap<String, GeoMatch>,
    }

    impl StaticLocator {
        pub(crate) fn new(cities: &[(&str, &str, f64, f64)]) -> Self {
            let entries = cities
                .iter()
                .map(|(name, timezone, latitude, longitude)| {
                    (
                        name.to_string(),
                        GeoMatch {
                            name: name.to_string(),
                            latitude: *latitude,
                            longitude: *longitude,
                            timezone: timezone.to_string(),
                        },
                    )
                })
                .collect();

            Self { entries }
        }

        pub(crate) fn with_common_cities() -> Self {
            Self::new(&[
                ("Warsaw", "Europe/Warsaw", 52.2298, 21.0118),
                ("Tokyo", "Asia/Tokyo", 35.6895, 139.6917),
                ("New York", "America/New_York", 40.7143, -74.006),
            ])
        }
    }

    #[async_trait]
    impl CityLocator for StaticLocator {
        async fn locate(&self, city: &str) -> TimeAgentResult<GeoMatch> {
            self.entries
                .get(city)
                .cloned()
                .ok_or_else(|| TimeAgentError::CityNotFound {
                    city: city.to_string(),
                })
        }
    }
}

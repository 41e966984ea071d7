use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::core::error::{TimeAgentError, TimeAgentResult};
use crate::core::geocode::CityLocator;
use crate::core::models::WeatherRecord;
use crate::core::provider::detect_local_timezone;

pub const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DAILY_METRICS: &str = "temperature_2m_max,temperature_2m_min,weathercode,windspeed_10m_max";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    weathercode: Vec<i64>,
    windspeed_10m_max: Vec<f64>,
}

/// Daily weather lookups backed by the Open-Meteo forecast API
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    locator: Arc<dyn CityLocator>,
    base_url: String,
    local_timezone: Tz,
}

impl WeatherClient {
    pub fn new(locator: Arc<dyn CityLocator>) -> Self {
        Self::with_base_url(locator, FORECAST_BASE_URL.to_string())
    }

    pub fn with_base_url(locator: Arc<dyn CityLocator>, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self {
            http,
            locator,
            base_url,
            local_timezone: detect_local_timezone(),
        }
    }

    /// Today's temperature extremes, condition code, and max wind for a city.
    ///
    /// The forecast window is pinned to the invoking process's local calendar
    /// day, not the city's; near midnight the two can differ.
    pub async fn today_weather(&self, city_name: &str) -> TimeAgentResult<WeatherRecord> {
        let location = self.locator.locate(city_name).await?;
        let today = Utc::now()
            .with_timezone(&self.local_timezone)
            .format("%Y-%m-%d")
            .to_string();

        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("daily", DAILY_METRICS.to_string()),
                ("timezone", "auto".to_string()),
                ("start_date", today.clone()),
                ("end_date", today.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TimeAgentError::Provider {
                message: format!("forecast failed: HTTP {}", status.as_u16()),
            });
        }

        let body = response.text().await?;
        record_from_forecast(&body, &location.name, &today)
    }
}

/// Build a weather record from a forecast response body, consuming index 0
/// of the equal-length daily arrays
fn record_from_forecast(body: &str, city: &str, date: &str) -> TimeAgentResult<WeatherRecord> {
    let parsed: ForecastResponse =
        serde_json::from_str(body).map_err(|e| TimeAgentError::Provider {
            message: format!("malformed forecast response: {e}"),
        })?;

    let daily = parsed.daily;
    let missing = |field: &str| TimeAgentError::Provider {
        message: format!("forecast response missing daily {field}"),
    };

    Ok(WeatherRecord {
        city: city.to_string(),
        date: date.to_string(),
        temperature_max: *daily
            .temperature_2m_max
            .first()
            .ok_or_else(|| missing("temperature_2m_max"))?,
        temperature_min: *daily
            .temperature_2m_min
            .first()
            .ok_or_else(|| missing("temperature_2m_min"))?,
        weather_code: *daily
            .weathercode
            .first()
            .ok_or_else(|| missing("weathercode"))?,
        wind_speed_max: *daily
            .windspeed_10m_max
            .first()
            .ok_or_else(|| missing("windspeed_10m_max"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geocode::testing::StaticLocator;

    const FORECAST_BODY: &str = r#"{
        "latitude": 52.25,
        "longitude": 21.0,
        "timezone": "Europe/Warsaw",
        "daily": {
            "time": ["2026-08-08"],
            "temperature_2m_max": [27.4],
            "temperature_2m_min": [15.1],
            "weathercode": [3],
            "windspeed_10m_max": [18.7]
        }
    }"#;

    #[test]
    fn test_record_from_forecast() {
        let record = record_from_forecast(FORECAST_BODY, "Warsaw", "2026-08-08").unwrap();

        assert_eq!(record.city, "Warsaw");
        assert_eq!(record.date, "2026-08-08");
        assert!((record.temperature_max - 27.4).abs() < f64::EPSILON);
        assert!((record.temperature_min - 15.1).abs() < f64::EPSILON);
        assert_eq!(record.weather_code, 3);
        assert!((record.wind_speed_max - 18.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_uses_resolved_display_name() {
        // The provider's spelling wins over the user's input
        let record = record_from_forecast(FORECAST_BODY, "Warszawa", "2026-08-08").unwrap();
        assert_eq!(record.city, "Warszawa");
    }

    #[test]
    fn test_empty_daily_series_is_provider_error() {
        let body = r#"{
            "daily": {
                "time": [],
                "temperature_2m_max": [],
                "temperature_2m_min": [],
                "weathercode": [],
                "windspeed_10m_max": []
            }
        }"#;

        let result = record_from_forecast(body, "Warsaw", "2026-08-08");
        assert!(matches!(result, Err(TimeAgentError::Provider { .. })));
    }

    #[test]
    fn test_malformed_body_is_provider_error() {
        let result = record_from_forecast("not json", "Warsaw", "2026-08-08");
        assert!(matches!(result, Err(TimeAgentError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_unknown_city_fails_before_forecast() {
        let client = WeatherClient::new(Arc::new(StaticLocator::with_common_cities()));
        let result = client.today_weather("Atlantis").await;
        assert!(matches!(result, Err(TimeAgentError::CityNotFound { .. })));
    }
}

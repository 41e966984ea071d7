use rmcp::schemars;
use serde::{Deserialize, Deserializer, Serialize};

/// Helper function to deserialize and trim strings
fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

/// Request to get the current time in a city
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetCurrentTimeRequest {
    /// City name (e.g., 'Warsaw', 'Tokyo', 'New York')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub city_name: String,
}

/// Request to convert a time between two cities
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertTimeRequest {
    /// City where the given time applies (e.g., 'Warsaw')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub source_city: String,
    /// City to convert the time to (e.g., 'Tokyo')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub target_city: String,
    /// Time to convert in 24-hour format (HH:MM)
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub time: String,
}

/// Request to get today's weather for a city
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetTodayWeatherRequest {
    /// City name to search by (e.g., 'Warsaw', 'Berlin', 'Paris')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub city_name: String,
}

/// Request to answer a natural-language time question
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TimeAgentRequest {
    /// A natural language query about time, e.g. 'What is the current time in Warsaw?'
    /// or 'When it is 15:00 in Warsaw, what time is it in Tokyo?'
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub query: String,
}

/// Today's weather for a city
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WeatherRecord {
    /// City display name as resolved by the geocoding provider
    pub city: String,
    /// ISO date the forecast covers
    pub date: String,
    /// Daily maximum temperature
    pub temperature_max: f64,
    /// Daily minimum temperature
    pub temperature_min: f64,
    /// WMO weather condition code
    pub weather_code: i64,
    /// Daily maximum wind speed
    pub wind_speed_max: f64,
}

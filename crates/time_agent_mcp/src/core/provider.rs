use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::error::{TimeAgentError, TimeAgentResult};
use crate::core::geocode::CityLocator;

// Format strings
pub const TIME_INPUT_FORMAT: &str = "%H:%M";
pub const DATETIME_ZONE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";
pub const CLOCK_ZONE_FORMAT: &str = "%H:%M %Z";

/// Detect the system's local timezone, falling back to UTC
pub(crate) fn detect_local_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(tz_name) => match tz_name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Could not parse timezone '{}', defaulting to UTC", tz_name);
                chrono_tz::UTC
            }
        },
        Err(_) => {
            tracing::warn!("Could not detect system timezone, defaulting to UTC");
            chrono_tz::UTC
        }
    }
}

/// City-based time operations built on a geocoding lookup
#[derive(Clone)]
pub struct CityTimeProvider {
    locator: Arc<dyn CityLocator>,
    pub(crate) local_timezone: Tz,
}

impl CityTimeProvider {
    pub fn new(locator: Arc<dyn CityLocator>) -> Self {
        Self {
            locator,
            local_timezone: detect_local_timezone(),
        }
    }

    /// Resolve a city name to its IANA timezone via one geocoding lookup
    pub async fn resolve_timezone(&self, city: &str) -> TimeAgentResult<(Tz, String)> {
        let location = self.locator.locate(city).await?;
        let tz = parse_timezone(&location.timezone)?;
        Ok((tz, location.timezone))
    }

    /// Current time in a city as a human-readable sentence
    pub async fn current_time(&self, city_name: &str) -> TimeAgentResult<String> {
        let (tz, tz_name) = self.resolve_timezone(city_name).await?;
        let now = Utc::now().with_timezone(&tz);

        Ok(format!(
            "The current time in {} is {} (timezone: {})",
            city_name,
            now.format(DATETIME_ZONE_FORMAT),
            tz_name
        ))
    }

    /// Convert an HH:MM clock time from one city's zone to another's,
    /// anchored to today's calendar date in the source zone
    pub async fn convert_time(
        &self,
        source_city: &str,
        target_city: &str,
        time_str: &str,
    ) -> TimeAgentResult<String> {
        let (source_tz, _) = self.resolve_timezone(source_city).await?;
        let (target_tz, _) = self.resolve_timezone(target_city).await?;

        let clock = parse_clock(time_str)?;
        let today = Utc::now().with_timezone(&source_tz).date_naive();
        let (source_dt, target_dt) = convert_clock(source_tz, target_tz, today, clock, time_str)?;

        let now_source = Utc::now().with_timezone(&source_tz);
        let now_target = Utc::now().with_timezone(&target_tz);

        Ok(format!(
            "{} in {} = {} in {} (currently {} in {}, {} in {})",
            source_dt.format(TIME_INPUT_FORMAT),
            source_city,
            target_dt.format(TIME_INPUT_FORMAT),
            target_city,
            now_source.format(CLOCK_ZONE_FORMAT),
            source_city,
            now_target.format(CLOCK_ZONE_FORMAT),
            target_city
        ))
    }
}

pub(crate) fn parse_timezone(timezone_name: &str) -> TimeAgentResult<Tz> {
    Tz::from_str(timezone_name).map_err(|_| TimeAgentError::Provider {
        message: format!("geocoding returned unknown timezone: {timezone_name}"),
    })
}

fn parse_clock(time_str: &str) -> TimeAgentResult<NaiveTime> {
    NaiveTime::parse_from_str(time_str, TIME_INPUT_FORMAT).map_err(|_| {
        TimeAgentError::InvalidTimeFormat {
            time: time_str.to_string(),
        }
    })
}

/// Map a clock time on a given date from the source zone to the target zone
/// by absolute-instant equivalence
fn convert_clock(
    source_tz: Tz,
    target_tz: Tz,
    date: NaiveDate,
    clock: NaiveTime,
    time_str: &str,
) -> TimeAgentResult<(DateTime<Tz>, DateTime<Tz>)> {
    let source_dt = source_tz
        .from_local_datetime(&date.and_time(clock))
        .single()
        .ok_or_else(|| TimeAgentError::AmbiguousTime {
            time: time_str.to_string(),
        })?;

    let target_dt = source_dt.with_timezone(&target_tz);
    Ok((source_dt, target_dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geocode::testing::StaticLocator;

    fn winter_day() -> NaiveDate {
        // Mid-January: Warsaw on CET (UTC+1), no DST anywhere relevant
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn clock(time: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time, TIME_INPUT_FORMAT).unwrap()
    }

    fn provider() -> CityTimeProvider {
        CityTimeProvider::new(Arc::new(StaticLocator::with_common_cities()))
    }

    #[test]
    fn test_convert_clock_warsaw_to_tokyo() {
        let (source, target) = convert_clock(
            chrono_tz::Europe::Warsaw,
            chrono_tz::Asia::Tokyo,
            winter_day(),
            clock("15:00"),
            "15:00",
        )
        .unwrap();

        assert_eq!(source.format(TIME_INPUT_FORMAT).to_string(), "15:00");
        assert_eq!(target.format(TIME_INPUT_FORMAT).to_string(), "23:00");
    }

    #[test]
    fn test_convert_clock_same_zone_is_identity() {
        let (source, target) = convert_clock(
            chrono_tz::Europe::Warsaw,
            chrono_tz::Europe::Warsaw,
            winter_day(),
            clock("09:30"),
            "09:30",
        )
        .unwrap();

        assert_eq!(source.format(TIME_INPUT_FORMAT).to_string(), "09:30");
        assert_eq!(target.format(TIME_INPUT_FORMAT).to_string(), "09:30");
        assert_eq!(source, target);
    }

    #[test]
    fn test_convert_clock_round_trip() {
        let (_, forward) = convert_clock(
            chrono_tz::Europe::Warsaw,
            chrono_tz::Asia::Tokyo,
            winter_day(),
            clock("15:00"),
            "15:00",
        )
        .unwrap();

        // Feed the forward result's clock time back on the target's own date
        let (_, back) = convert_clock(
            chrono_tz::Asia::Tokyo,
            chrono_tz::Europe::Warsaw,
            forward.date_naive(),
            forward.time(),
            "23:00",
        )
        .unwrap();

        assert_eq!(back.format(TIME_INPUT_FORMAT).to_string(), "15:00");
    }

    #[test]
    fn test_convert_clock_nonexistent_local_time() {
        // 02:30 on the spring-forward day does not exist in Warsaw
        let spring_forward = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        let result = convert_clock(
            chrono_tz::Europe::Warsaw,
            chrono_tz::Asia::Tokyo,
            spring_forward,
            clock("02:30"),
            "02:30",
        );

        assert!(matches!(result, Err(TimeAgentError::AmbiguousTime { .. })));
    }

    #[test]
    fn test_parse_clock_rejects_out_of_range() {
        assert!(matches!(
            parse_clock("25:00"),
            Err(TimeAgentError::InvalidTimeFormat { .. })
        ));
        assert!(matches!(
            parse_clock("not a time"),
            Err(TimeAgentError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("Europe/Warsaw").is_ok());
        assert!(matches!(
            parse_timezone("Invalid/Timezone"),
            Err(TimeAgentError::Provider { .. })
        ));
    }

    #[tokio::test]
    async fn test_current_time_sentence() {
        let result = provider().current_time("Warsaw").await.unwrap();

        assert!(result.starts_with("The current time in Warsaw is "));
        assert!(result.contains("(timezone: Europe/Warsaw)"));
    }

    #[tokio::test]
    async fn test_current_time_unknown_city() {
        let result = provider().current_time("Atlantis").await;
        assert!(matches!(result, Err(TimeAgentError::CityNotFound { .. })));
    }

    #[tokio::test]
    async fn test_convert_time_sentence() {
        let result = provider()
            .convert_time("Warsaw", "Tokyo", "15:00")
            .await
            .unwrap();

        assert!(result.starts_with("15:00 in Warsaw = "));
        assert!(result.contains(" in Tokyo (currently "));
        assert!(result.contains(" in Warsaw, "));
    }

    #[tokio::test]
    async fn test_convert_time_same_city() {
        let result = provider()
            .convert_time("Warsaw", "Warsaw", "09:30")
            .await
            .unwrap();

        assert!(result.starts_with("09:30 in Warsaw = 09:30 in Warsaw"));
        assert!(result.contains("currently"));
    }

    #[tokio::test]
    async fn test_convert_time_rejects_bad_clock() {
        let result = provider().convert_time("Warsaw", "Tokyo", "15h00").await;
        assert!(matches!(
            result,
            Err(TimeAgentError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn test_local_timezone_detection_never_panics() {
        let provider = provider();
        assert!(!provider.local_timezone.to_string().is_empty());
    }
}

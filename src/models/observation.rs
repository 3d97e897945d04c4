//! Scoring inputs: weather, traffic, time of day and situational flags
//!
//! External labels are loosely typed strings; every enum here parses them
//! case-insensitively and falls back to an explicit `Unknown` variant. An
//! empty label counts as absent.

use serde::{Deserialize, Deserializer, Serialize};

/// Optional label field where `""` deserializes to `None`
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.filter(|l| !l.is_empty()).map(T::from))
}

/// Weather condition reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Snow,
    Fog,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Parse a provider label, e.g. OpenWeatherMap's `weather[0].main`
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "rain" => Self::Rain,
            "snow" => Self::Snow,
            "fog" => Self::Fog,
            "thunderstorm" => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for WeatherCondition {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

/// Current weather at a location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherObservation {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub condition: Option<WeatherCondition>,
    /// Wind speed in m/s
    pub wind_speed: Option<f64>,
    /// Visibility in meters
    pub visibility: Option<f64>,
}

/// Traffic density label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CongestionLevel {
    Light,
    Moderate,
    Heavy,
    Severe,
    Unknown,
}

impl CongestionLevel {
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "moderate" => Self::Moderate,
            "heavy" => Self::Heavy,
            "severe" => Self::Severe,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for CongestionLevel {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

/// Current traffic at a location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficObservation {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub congestion_level: Option<CongestionLevel>,
}

/// Coarse time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
    Unknown,
}

impl TimeOfDay {
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "morning" => Self::Morning,
            "afternoon" => Self::Afternoon,
            "evening" => Self::Evening,
            "night" => Self::Night,
            _ => Self::Unknown,
        }
    }

    /// Bucket for a local hour of day (0..=23)
    #[must_use]
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }
}

impl From<String> for TimeOfDay {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

/// Location characteristics that shift risk up or down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SituationalFactors {
    pub construction: bool,
    pub school_zone: bool,
    pub hospital_nearby: bool,
    pub shopping_area: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parse_is_case_insensitive() {
        assert_eq!(WeatherCondition::parse("Rain"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::parse("THUNDERSTORM"), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::parse("Drizzle"), WeatherCondition::Unknown);
        assert_eq!(WeatherCondition::parse("Mist"), WeatherCondition::Unknown);
    }

    #[test]
    fn test_observation_deserializes_loose_labels() {
        let weather: WeatherObservation =
            serde_json::from_str(r#"{"condition":"Snow","windSpeed":3.5}"#).unwrap();
        assert_eq!(weather.condition, Some(WeatherCondition::Snow));
        assert_eq!(weather.wind_speed, Some(3.5));
        assert_eq!(weather.visibility, None);

        let traffic: TrafficObservation =
            serde_json::from_str(r#"{"congestionLevel":"gridlock"}"#).unwrap();
        assert_eq!(traffic.congestion_level, Some(CongestionLevel::Unknown));

        let time: TimeOfDay = serde_json::from_str(r#""Evening""#).unwrap();
        assert_eq!(time, TimeOfDay::Evening);
    }

    #[test]
    fn test_empty_labels_are_absent() {
        let weather: WeatherObservation =
            serde_json::from_str(r#"{"condition":"","windSpeed":12}"#).unwrap();
        assert_eq!(weather.condition, None);
        assert_eq!(weather.wind_speed, Some(12.0));

        let weather: WeatherObservation = serde_json::from_str(r#"{"condition":null}"#).unwrap();
        assert_eq!(weather.condition, None);

        let traffic: TrafficObservation =
            serde_json::from_str(r#"{"congestionLevel":""}"#).unwrap();
        assert_eq!(traffic.congestion_level, None);

        let traffic: TrafficObservation = serde_json::from_str("{}").unwrap();
        assert_eq!(traffic.congestion_level, None);
    }

    #[test]
    fn test_factors_default_missing_flags() {
        let factors: SituationalFactors =
            serde_json::from_str(r#"{"schoolZone":true}"#).unwrap();
        assert!(factors.school_zone);
        assert!(!factors.construction);
        assert!(!factors.hospital_nearby);
        assert!(!factors.shopping_area);
    }

    #[test]
    fn test_time_of_day_from_hour() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&CongestionLevel::Severe).unwrap(),
            r#""severe""#
        );
        assert_eq!(serde_json::to_string(&TimeOfDay::Night).unwrap(), r#""night""#);
    }
}

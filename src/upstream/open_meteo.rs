//! Open-Meteo forecast and geocoding (no API key required)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{ConditionLabel, HttpClient, WeatherProvider, build_url, read_json, send};
use crate::config::UpstreamConfig;
use crate::models::{Coordinate, WeatherCondition, WeatherObservation};
use crate::{Result, SafeCityError};

const SERVICE: &str = "open_meteo";
pub const WEATHER_SOURCE: &str = "Open-Meteo (Free)";
pub const GEOCODING_SOURCE: &str = "Open-Meteo Geocoding (Free)";
const HOURLY_SLICE: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeWeatherLocation {
    pub name: String,
    pub coordinates: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeCurrentWeather {
    pub temperature: f64,
    /// km/h
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub weather_code: u8,
    pub condition: ConditionLabel,
    /// Local ISO time as reported by Open-Meteo
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlySeries {
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub wind_speed: Vec<f64>,
    pub wind_direction: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeUnitLabels {
    pub temperature: String,
    pub wind_speed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeWeather {
    pub location: FreeWeatherLocation,
    pub current: FreeCurrentWeather,
    pub hourly: HourlySeries,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub units: FreeUnitLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinate,
    pub admin1: Option<String>,
    pub admin2: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResults {
    pub query: String,
    pub results: Vec<GeocodedPlace>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// `OpenMeteo` API response structures
mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct CurrentWeather {
        pub temperature: f64,
        pub windspeed: f64,
        pub winddirection: f64,
        pub weathercode: u8,
        pub time: String,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct HourlyData {
        #[serde(default)]
        pub temperature_2m: Vec<Option<f64>>,
        #[serde(default)]
        pub relative_humidity_2m: Vec<Option<f64>>,
        #[serde(default)]
        pub wind_speed_10m: Vec<Option<f64>>,
        #[serde(default)]
        pub wind_direction_10m: Vec<Option<f64>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current_weather: CurrentWeather,
        #[serde(default)]
        pub hourly: HourlyData,
    }

    /// Current block requested with `wind_speed_unit=ms`
    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        pub weather_code: Option<u8>,
        pub wind_speed_10m: Option<f64>,
        pub visibility: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ObservationResponse {
        pub current: CurrentData,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
        pub admin1: Option<String>,
        pub admin2: Option<String>,
        pub timezone: Option<String>,
    }
}

impl From<wire::GeocodingResult> for GeocodedPlace {
    fn from(result: wire::GeocodingResult) -> Self {
        Self {
            name: result.name,
            country: result.country,
            coordinates: Coordinate::new(result.latitude, result.longitude),
            admin1: result.admin1,
            admin2: result.admin2,
            timezone: result.timezone,
        }
    }
}

/// Convert a WMO weather code to a human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown weather condition",
    }
}

/// Dashboard label for a WMO weather code
#[must_use]
pub fn weather_code_label(code: u8) -> ConditionLabel {
    let main = match code {
        0 => "Clear",
        1..=3 => "Clouds",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 | 80..=82 => "Rain",
        71..=77 | 85 | 86 => "Snow",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    };
    ConditionLabel {
        main: main.to_string(),
        description: weather_code_to_description(code).to_string(),
        icon: None,
    }
}

/// Scoring condition for a WMO weather code; drizzle counts as rain
#[must_use]
pub fn weather_code_condition(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::Clouds,
        45 | 48 => WeatherCondition::Fog,
        51..=67 | 80..=82 => WeatherCondition::Rain,
        71..=77 | 85 | 86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Unknown,
    }
}

fn first_day(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().take(HOURLY_SLICE).flatten().collect()
}

/// Open-Meteo API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: HttpClient,
    base_url: String,
    geocoding_url: String,
}

impl OpenMeteoClient {
    #[must_use]
    pub fn new(client: HttpClient, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.open_meteo_base_url.trim_end_matches('/').to_string(),
            geocoding_url: config.open_meteo_geocoding_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current weather plus the next 24 hourly values
    #[instrument(skip(self))]
    pub async fn current_weather(&self, at: &Coordinate, name: Option<&str>) -> Result<FreeWeather> {
        let url = build_url(
            SERVICE,
            &format!("{}/forecast", self.base_url),
            &[
                ("latitude", at.lat.to_string()),
                ("longitude", at.lng.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "hourly",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,wind_direction_10m"
                        .to_string(),
                ),
            ],
        )?;

        let response = send(SERVICE, self.client.get(url)).await?;
        let data: wire::ForecastResponse = read_json(SERVICE, response).await?;
        let current = data.current_weather;

        Ok(FreeWeather {
            location: FreeWeatherLocation {
                name: name.map_or_else(|| format!("{}, {}", at.lat, at.lng), str::to_string),
                coordinates: *at,
            },
            current: FreeCurrentWeather {
                temperature: current.temperature,
                wind_speed: current.windspeed,
                wind_direction: current.winddirection,
                weather_code: current.weathercode,
                condition: weather_code_label(current.weathercode),
                time: current.time,
            },
            hourly: HourlySeries {
                temperature: first_day(data.hourly.temperature_2m),
                humidity: first_day(data.hourly.relative_humidity_2m),
                wind_speed: first_day(data.hourly.wind_speed_10m),
                wind_direction: first_day(data.hourly.wind_direction_10m),
            },
            timestamp: Utc::now(),
            source: WEATHER_SOURCE.to_string(),
            units: FreeUnitLabels {
                temperature: "°C".to_string(),
                wind_speed: "km/h".to_string(),
            },
        })
    }

    /// Forward geocoding; an empty result set is `NotFound`
    #[instrument(skip(self))]
    pub async fn geocode(&self, name: &str, count: u8) -> Result<Vec<GeocodedPlace>> {
        info!("Geocoding location: '{}'", name);

        let url = build_url(
            SERVICE,
            &format!("{}/search", self.geocoding_url),
            &[
                ("name", name.to_string()),
                ("count", count.to_string()),
                ("language", "en".to_string()),
                ("format", "json".to_string()),
            ],
        )?;

        let response = send(SERVICE, self.client.get(url)).await?;
        let data: wire::GeocodingResponse = read_json(SERVICE, response).await?;

        let results: Vec<GeocodedPlace> = data
            .results
            .unwrap_or_default()
            .into_iter()
            .map(GeocodedPlace::from)
            .collect();

        if results.is_empty() {
            warn!("No results found for location '{}'", name);
            return Err(SafeCityError::not_found("Address not found"));
        }
        Ok(results)
    }

    /// Up to five matches wrapped for the dashboard
    pub async fn geocode_results(&self, address: &str) -> Result<GeocodeResults> {
        Ok(GeocodeResults {
            query: address.to_string(),
            results: self.geocode(address, 5).await?,
            source: GEOCODING_SOURCE.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Best match for a city name
    pub async fn locate_city(&self, city: &str) -> Result<Coordinate> {
        match self.geocode(city, 1).await {
            Ok(places) => places
                .into_iter()
                .next()
                .map(|place| place.coordinates)
                .ok_or_else(|| SafeCityError::not_found("City not found")),
            Err(SafeCityError::NotFound { .. }) => Err(SafeCityError::not_found("City not found")),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current_observation(&self, at: &Coordinate) -> Result<WeatherObservation> {
        let url = build_url(
            SERVICE,
            &format!("{}/forecast", self.base_url),
            &[
                ("latitude", at.lat.to_string()),
                ("longitude", at.lng.to_string()),
                ("current", "weather_code,wind_speed_10m,visibility".to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ],
        )?;

        let response = send(SERVICE, self.client.get(url)).await?;
        let data: wire::ObservationResponse = read_json(SERVICE, response).await?;

        Ok(WeatherObservation {
            condition: data.current.weather_code.map(weather_code_condition),
            wind_speed: data.current.wind_speed_10m,
            visibility: data.current.visibility,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, WeatherCondition::Clear, "Clear")]
    #[case(2, WeatherCondition::Clouds, "Clouds")]
    #[case(48, WeatherCondition::Fog, "Fog")]
    #[case(53, WeatherCondition::Rain, "Drizzle")]
    #[case(81, WeatherCondition::Rain, "Rain")]
    #[case(75, WeatherCondition::Snow, "Snow")]
    #[case(99, WeatherCondition::Thunderstorm, "Thunderstorm")]
    #[case(42, WeatherCondition::Unknown, "Unknown")]
    fn test_weather_code_mapping(
        #[case] code: u8,
        #[case] condition: WeatherCondition,
        #[case] main: &str,
    ) {
        assert_eq!(weather_code_condition(code), condition);
        assert_eq!(weather_code_label(code).main, main);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(weather_code_to_description(0), "Clear sky");
        assert_eq!(weather_code_to_description(65), "Heavy rain");
        assert_eq!(weather_code_to_description(200), "Unknown weather condition");
    }

    #[test]
    fn test_forecast_response_parses_and_slices() {
        let hourly: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let series = hourly.join(",");
        let body = format!(
            r#"{{
                "current_weather": {{"temperature": 14.2, "windspeed": 11.5, "winddirection": 270,
                                     "weathercode": 3, "time": "2024-05-01T12:00"}},
                "hourly": {{"temperature_2m": [{series}], "relative_humidity_2m": [{series}],
                            "wind_speed_10m": [{series}], "wind_direction_10m": [{series}]}}
            }}"#
        );
        let data: wire::ForecastResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(data.current_weather.weathercode, 3);
        let temps = first_day(data.hourly.temperature_2m);
        assert_eq!(temps.len(), 24);
        assert_eq!(temps[23], 23.0);
    }

    #[test]
    fn test_geocoding_result_conversion() {
        let body = r#"{"results": [{"id": 1, "name": "Berlin", "latitude": 52.52, "longitude": 13.41,
                       "country": "Germany", "admin1": "Land Berlin", "timezone": "Europe/Berlin"}]}"#;
        let data: wire::GeocodingResponse = serde_json::from_str(body).unwrap();
        let place = GeocodedPlace::from(data.results.unwrap().remove(0));
        assert_eq!(place.coordinates, Coordinate::new(52.52, 13.41));
        assert_eq!(place.admin2, None);
        assert_eq!(place.timezone.as_deref(), Some("Europe/Berlin"));
    }
}

//! OpenWeatherMap current weather, 5-day forecast and air pollution

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

use super::{ConditionLabel, HttpClient, WeatherProvider, build_url, read_json, send};
use crate::config::UpstreamConfig;
use crate::models::{Coordinate, WeatherCondition, WeatherObservation};
use crate::{Result, SafeCityError};

const SERVICE: &str = "openweather";

/// Measurement system for temperatures and wind speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            _ => Err(SafeCityError::validation(
                "Units must be either metric or imperial",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    fn labels(self, with_visibility: bool) -> UnitLabels {
        let (temperature, wind_speed) = match self {
            Self::Metric => ("°C", "m/s"),
            Self::Imperial => ("°F", "mph"),
        };
        UnitLabels {
            temperature: temperature.to_string(),
            wind_speed: wind_speed.to_string(),
            pressure: "hPa".to_string(),
            visibility: with_visibility.then(|| "m".to_string()),
        }
    }
}

/// Location to query, either a point or a city name
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates(Coordinate),
    City(String),
}

impl WeatherQuery {
    /// Stable fragment for cache keys
    #[must_use]
    pub fn cache_fragment(&self) -> String {
        match self {
            Self::Coordinates(c) => format!("{}_{}", c.lat, c.lng),
            Self::City(city) => city.clone(),
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Coordinates(c) => vec![("lat", c.lat.to_string()), ("lon", c.lng.to_string())],
            Self::City(city) => vec![("q", city.clone())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitLabels {
    pub temperature: String,
    pub wind_speed: String,
    pub pressure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    /// Meters; OpenWeatherMap caps this at 10 km
    pub visibility: Option<f64>,
    /// Not provided by the current weather endpoint
    pub uv_index: Option<f64>,
    pub wind_speed: f64,
    pub wind_direction: Option<f64>,
    pub cloud_cover: f64,
    pub condition: ConditionLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location: NamedLocation,
    pub current: CurrentConditions,
    pub sun: SunTimes,
    pub timestamp: DateTime<Utc>,
    pub units: UnitLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub wind_direction: Option<f64>,
    pub cloud_cover: f64,
    pub condition: ConditionLabel,
    /// Percent, 0..=100
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub main: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature: TemperatureRange,
    pub condition: ConditionSummary,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation_probability: f64,
    pub hourly_data: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: NamedLocation,
    pub forecast: Vec<DailyForecast>,
    pub timestamp: DateTime<Utc>,
    pub units: UnitLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    /// 1 (good) ..= 5 (very poor)
    pub index: u8,
    pub index_description: Option<String>,
    /// Pollutant concentrations in μg/m³
    pub components: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityLocation {
    pub coordinates: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityReport {
    pub location: AirQualityLocation,
    pub air_quality: AirQuality,
    pub timestamp: DateTime<Utc>,
}

/// Description for an OpenWeatherMap air quality index
#[must_use]
pub fn aqi_description(index: u8) -> Option<&'static str> {
    match index {
        1 => Some("Good"),
        2 => Some("Fair"),
        3 => Some("Moderate"),
        4 => Some("Poor"),
        5 => Some("Very Poor"),
        _ => None,
    }
}

/// OpenWeatherMap API response structures
mod wire {
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize)]
    pub struct Coord {
        pub lat: f64,
        pub lon: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub main: String,
        pub description: String,
        pub icon: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
        pub feels_like: f64,
        pub humidity: f64,
        pub pressure: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
        pub deg: Option<f64>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Clouds {
        pub all: f64,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Sys {
        pub country: Option<String>,
        pub sunrise: i64,
        pub sunset: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentResponse {
        pub name: String,
        pub coord: Coord,
        #[serde(default)]
        pub sys: Sys,
        pub main: Main,
        pub visibility: Option<f64>,
        pub wind: Wind,
        #[serde(default)]
        pub clouds: Clouds,
        pub weather: Vec<Condition>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastItem {
        pub dt: i64,
        pub main: Main,
        pub wind: Wind,
        #[serde(default)]
        pub clouds: Clouds,
        pub weather: Vec<Condition>,
        #[serde(default)]
        pub pop: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct City {
        pub name: String,
        pub country: Option<String>,
        pub coord: Coord,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<ForecastItem>,
        pub city: City,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirMain {
        pub aqi: u8,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirItem {
        pub dt: i64,
        pub main: AirMain,
        pub components: BTreeMap<String, f64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct AirResponse {
        pub list: Vec<AirItem>,
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        SafeCityError::upstream(SERVICE, format!("timestamp {seconds} out of range"))
    })
}

fn first_condition(conditions: Vec<wire::Condition>) -> ConditionLabel {
    conditions
        .into_iter()
        .next()
        .map(|c| ConditionLabel {
            main: c.main,
            description: c.description,
            icon: c.icon,
        })
        .unwrap_or_else(|| ConditionLabel {
            main: "Unknown".to_string(),
            description: "Unknown weather condition".to_string(),
            icon: None,
        })
}

impl From<wire::Coord> for Coordinate {
    fn from(coord: wire::Coord) -> Self {
        Coordinate::new(coord.lat, coord.lon)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Most frequent `condition.main`; ties go to the label seen latest
fn most_common_condition(hours: &[HourlyForecast]) -> ConditionSummary {
    let mut seen: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, hour) in hours.iter().enumerate() {
        let entry = seen.entry(hour.condition.main.as_str()).or_insert((0, index));
        entry.0 += 1;
        entry.1 = index;
    }

    let main = seen
        .into_iter()
        .max_by_key(|(_, (count, last))| (*count, *last))
        .map(|(main, _)| main.to_string())
        .unwrap_or_default();

    let description = hours
        .iter()
        .find(|h| h.condition.main == main)
        .map(|h| h.condition.description.clone())
        .unwrap_or_default();

    ConditionSummary { main, description }
}

/// Group 3-hourly entries into per-day summaries (UTC dates), keeping the first `days`
#[must_use]
pub fn daily_summaries(hours: Vec<HourlyForecast>, days: usize) -> Vec<DailyForecast> {
    hours
        .chunk_by(|a, b| a.time.date_naive() == b.time.date_naive())
        .take(days)
        .map(|day| {
            let temps = || day.iter().map(|h| h.temperature);
            DailyForecast {
                date: day[0].time.date_naive(),
                temperature: TemperatureRange {
                    min: temps().fold(f64::INFINITY, f64::min),
                    max: temps().fold(f64::NEG_INFINITY, f64::max),
                    average: mean(temps()),
                },
                condition: most_common_condition(day),
                humidity: mean(day.iter().map(|h| h.humidity)),
                wind_speed: mean(day.iter().map(|h| h.wind_speed)),
                precipitation_probability: day
                    .iter()
                    .map(|h| h.precipitation_probability)
                    .fold(0.0, f64::max),
                hourly_data: day.to_vec(),
            }
        })
        .collect()
}

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    #[must_use]
    pub fn new(client: HttpClient, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
            api_key: config.openweather_api_key.clone(),
        }
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            SafeCityError::upstream(SERVICE, "OpenWeatherMap API key is not configured")
        })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        params.push(("appid", self.api_key()?.to_string()));
        let url = build_url(SERVICE, &format!("{}/{endpoint}", self.base_url), &params)?;
        debug!("OpenWeatherMap request: {endpoint}");

        let response = send(SERVICE, self.client.get(url)).await?;
        if response.status().as_u16() == 404 {
            return Err(SafeCityError::not_found("Location not found"));
        }
        read_json(SERVICE, response).await
    }

    /// Current conditions for a point or city
    #[instrument(skip(self, query), fields(query = %query.cache_fragment()))]
    pub async fn current(&self, query: &WeatherQuery, units: Units) -> Result<CurrentWeather> {
        let mut params = query.params();
        params.push(("units", units.as_str().to_string()));
        let data: wire::CurrentResponse = self.fetch("weather", params).await?;

        Ok(CurrentWeather {
            location: NamedLocation {
                name: data.name,
                country: data.sys.country,
                coordinates: data.coord.into(),
            },
            current: CurrentConditions {
                temperature: data.main.temp,
                feels_like: data.main.feels_like,
                humidity: data.main.humidity,
                pressure: data.main.pressure,
                visibility: data.visibility,
                uv_index: None,
                wind_speed: data.wind.speed,
                wind_direction: data.wind.deg,
                cloud_cover: data.clouds.all,
                condition: first_condition(data.weather),
            },
            sun: SunTimes {
                sunrise: timestamp(data.sys.sunrise)?,
                sunset: timestamp(data.sys.sunset)?,
            },
            timestamp: Utc::now(),
            units: units.labels(true),
        })
    }

    /// Daily summaries built from the 3-hourly 5-day forecast
    #[instrument(skip(self, query), fields(query = %query.cache_fragment()))]
    pub async fn forecast(&self, query: &WeatherQuery, units: Units, days: usize) -> Result<Forecast> {
        let mut params = query.params();
        params.push(("units", units.as_str().to_string()));
        let data: wire::ForecastResponse = self.fetch("forecast", params).await?;

        let hours = data
            .list
            .into_iter()
            .map(|item| {
                Ok(HourlyForecast {
                    time: timestamp(item.dt)?,
                    temperature: item.main.temp,
                    feels_like: item.main.feels_like,
                    humidity: item.main.humidity,
                    pressure: item.main.pressure,
                    wind_speed: item.wind.speed,
                    wind_direction: item.wind.deg,
                    cloud_cover: item.clouds.all,
                    condition: first_condition(item.weather),
                    precipitation_probability: item.pop * 100.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let forecast = daily_summaries(hours, days);
        info!("Built {} daily forecast summaries", forecast.len());

        Ok(Forecast {
            location: NamedLocation {
                name: data.city.name,
                country: data.city.country,
                coordinates: data.city.coord.into(),
            },
            forecast,
            timestamp: Utc::now(),
            units: units.labels(false),
        })
    }

    #[instrument(skip(self))]
    pub async fn air_quality(&self, at: &Coordinate) -> Result<AirQualityReport> {
        let params = vec![("lat", at.lat.to_string()), ("lon", at.lng.to_string())];
        let data: wire::AirResponse = self.fetch("air_pollution", params).await?;
        let reading = data
            .list
            .into_iter()
            .next()
            .ok_or_else(|| SafeCityError::upstream(SERVICE, "empty air pollution response"))?;

        Ok(AirQualityReport {
            location: AirQualityLocation { coordinates: *at },
            air_quality: AirQuality {
                index: reading.main.aqi,
                index_description: aqi_description(reading.main.aqi).map(str::to_string),
                components: reading.components,
            },
            timestamp: timestamp(reading.dt)?,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_observation(&self, at: &Coordinate) -> Result<WeatherObservation> {
        let weather = self
            .current(&WeatherQuery::Coordinates(*at), Units::Metric)
            .await?;
        Ok(WeatherObservation {
            condition: Some(WeatherCondition::parse(&weather.current.condition.main)),
            wind_speed: Some(weather.current.wind_speed),
            visibility: weather.current.visibility,
        })
    }
}

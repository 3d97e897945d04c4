//! OpenWeatherMap proxy routes

use axum::{
    Json, Router,
    extract::rejection::QueryRejection,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use super::{AppState, Cached, FailureMessage, PointQuery, cached, query_params};
use crate::models::Coordinate;
use crate::upstream::openweather::{AirQualityReport, CurrentWeather, Forecast, Units, WeatherQuery};
use crate::validation::validate_city;
use crate::{Result, SafeCityError};

const MAX_FORECAST_DAYS: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/current", get(current))
        .route("/forecast", get(forecast))
        .route("/air-quality", get(air_quality))
}

/// Point or city, plus display units
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
    pub units: Option<String>,
    pub days: Option<usize>,
}

impl LocationQuery {
    /// Coordinates win over a city when both are given
    pub(crate) fn target(&self) -> Result<WeatherQuery> {
        match (self.lat, self.lng, self.city.as_deref()) {
            (Some(_), Some(_), _) => Ok(WeatherQuery::Coordinates(Coordinate::from_parts(
                self.lat, self.lng,
            )?)),
            (_, _, Some(city)) => Ok(WeatherQuery::City(validate_city(city)?.to_string())),
            _ => Err(SafeCityError::validation(
                "Either coordinates (lat, lng) or city parameter is required",
            )),
        }
    }

    fn units(&self) -> Result<Units> {
        self.units.as_deref().map_or(Ok(Units::Metric), Units::parse)
    }

    fn days(&self) -> Result<usize> {
        let days = self.days.unwrap_or(MAX_FORECAST_DAYS);
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(SafeCityError::validation(format!(
                "Days must be between 1 and {MAX_FORECAST_DAYS}"
            )));
        }
        Ok(days)
    }
}

async fn current(
    State(state): State<AppState>,
    query: std::result::Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<Cached<CurrentWeather>>> {
    let params = query_params(query)?;
    let target = params.target()?;
    let units = params.units()?;

    let key = format!("current_weather_{}_{}", target.cache_fragment(), units.as_str());
    cached(&state.cache, &key, state.config.cache.weather_ttl(), || async {
        state
            .providers
            .openweather
            .current(&target, units)
            .await
            .failure_message("Failed to fetch current weather data")
    })
    .await
}

async fn forecast(
    State(state): State<AppState>,
    query: std::result::Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<Cached<Forecast>>> {
    let params = query_params(query)?;
    let target = params.target()?;
    let units = params.units()?;
    let days = params.days()?;

    let key = format!(
        "forecast_{}_{}_{}",
        target.cache_fragment(),
        units.as_str(),
        days
    );
    cached(&state.cache, &key, state.config.cache.weather_ttl(), || async {
        state
            .providers
            .openweather
            .forecast(&target, units, days)
            .await
            .failure_message("Failed to fetch weather forecast")
    })
    .await
}

async fn air_quality(
    State(state): State<AppState>,
    query: std::result::Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<Cached<AirQualityReport>>> {
    let at = query_params(query)?.coordinate()?;

    let key = format!("air_quality_{}_{}", at.lat, at.lng);
    cached(&state.cache, &key, state.config.cache.weather_ttl(), || async {
        state
            .providers
            .openweather
            .air_quality(&at)
            .await
            .failure_message("Failed to fetch air quality data")
    })
    .await
}

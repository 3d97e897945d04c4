//! Keyless providers: Open-Meteo, Nominatim and Overpass

use axum::{
    Json, Router,
    extract::rejection::QueryRejection,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use super::{AppState, COORDINATES_REQUIRED, Cached, FailureMessage, PointQuery, cached, query_params, required_coordinate};
use crate::upstream::nominatim::ReverseGeocode;
use crate::upstream::open_meteo::{FreeWeather, GeocodeResults};
use crate::upstream::overpass::NearbyPlaces;
use crate::validation::{validate_city, validate_radius, validate_tag_key};
use crate::{Result, SafeCityError};

const DEFAULT_PLACES_RADIUS_M: u32 = 1000;
const DEFAULT_PLACE_TAG: &str = "amenity";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/weather/current", get(current_weather))
        .route("/geocode", get(geocode))
        .route("/reverse-geocode", get(reverse_geocode))
        .route("/places/nearby", get(nearby_places))
}

#[derive(Debug, Deserialize)]
pub struct FreeWeatherQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
}

async fn current_weather(
    State(state): State<AppState>,
    query: std::result::Result<Query<FreeWeatherQuery>, QueryRejection>,
) -> Result<Json<Cached<FreeWeather>>> {
    let params = query_params(query)?;
    let open_meteo = &state.providers.open_meteo;

    let (at, name) = match (params.lat, params.lng, params.city.as_deref()) {
        (Some(_), Some(_), _) => (
            required_coordinate(params.lat, params.lng, COORDINATES_REQUIRED)?,
            None,
        ),
        (_, _, Some(city)) => {
            let city = validate_city(city)?;
            let at = open_meteo
                .locate_city(city)
                .await
                .failure_message("Failed to fetch weather data")?;
            (at, Some(city.to_string()))
        }
        _ => {
            return Err(SafeCityError::validation(
                "Either coordinates (lat, lng) or city parameter is required",
            ));
        }
    };

    let key = format!("free_weather_{}_{}", at.lat, at.lng);
    cached(&state.cache, &key, state.config.cache.free_api_ttl(), || async {
        open_meteo
            .current_weather(&at, name.as_deref())
            .await
            .failure_message("Failed to fetch weather data")
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

impl AddressQuery {
    pub(crate) fn address(&self) -> Result<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| SafeCityError::validation("Address parameter is required"))
    }
}

async fn geocode(
    State(state): State<AppState>,
    query: std::result::Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<Cached<GeocodeResults>>> {
    let params = query_params(query)?;
    let address = params.address()?;

    let key = format!("free_geocode_{address}");
    cached(&state.cache, &key, state.config.cache.free_api_ttl(), || async {
        state
            .providers
            .open_meteo
            .geocode_results(address)
            .await
            .failure_message("Failed to geocode address")
    })
    .await
}

async fn reverse_geocode(
    State(state): State<AppState>,
    query: std::result::Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<Cached<ReverseGeocode>>> {
    let at = query_params(query)?.coordinate()?;

    let key = format!("free_reverse_{}_{}", at.lat, at.lng);
    cached(&state.cache, &key, state.config.cache.free_api_ttl(), || async {
        state
            .providers
            .nominatim
            .reverse(&at)
            .await
            .failure_message("Failed to reverse geocode coordinates")
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct PlacesQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Meters
    pub radius: Option<u32>,
    /// OpenStreetMap tag key
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

async fn nearby_places(
    State(state): State<AppState>,
    query: std::result::Result<Query<PlacesQuery>, QueryRejection>,
) -> Result<Json<Cached<NearbyPlaces>>> {
    let params = query_params(query)?;
    let at = required_coordinate(params.lat, params.lng, COORDINATES_REQUIRED)?;
    let radius = validate_radius(params.radius.unwrap_or(DEFAULT_PLACES_RADIUS_M))?;
    let tag = validate_tag_key(params.kind.as_deref().unwrap_or(DEFAULT_PLACE_TAG))?;
    let limit = state.config.risk.max_places;

    let key = format!("free_places_{}_{}_{}_{}", at.lat, at.lng, radius, tag);
    cached(&state.cache, &key, state.config.cache.free_api_ttl(), || async {
        state
            .providers
            .overpass
            .nearby(&at, radius, tag, limit)
            .await
            .failure_message("Failed to search nearby places")
    })
    .await
}

//! Google Maps proxy routes and simulated traffic

use axum::{
    Json, Router,
    extract::rejection::QueryRejection,
    extract::{Query, State},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;

use super::{AppState, COORDINATES_REQUIRED, Cached, FailureMessage, PointQuery, cached, query_params, required_coordinate};
use crate::upstream::google_maps::{GeocodedAddress, ReverseGeocodedAddress, StaticMap, StaticMapParams};
use crate::upstream::traffic::TrafficReport;
use crate::validation::{validate_address, validate_radius};
use crate::{Result, SafeCityError};

const DEFAULT_TRAFFIC_RADIUS_M: u32 = 5000;
const MAX_ZOOM: u8 = 21;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/geocode", get(geocode))
        .route("/reverse-geocode", get(reverse_geocode))
        .route("/traffic", get(traffic))
        .route("/static-map", get(static_map))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub address: Option<String>,
}

async fn geocode(
    State(state): State<AppState>,
    query: std::result::Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<Cached<GeocodedAddress>>> {
    let params = query_params(query)?;
    let address = params
        .address
        .as_deref()
        .ok_or_else(|| SafeCityError::validation("Address parameter is required"))?;
    let address = validate_address(address)?;

    let key = format!("geocode_{address}");
    cached(&state.cache, &key, state.config.cache.maps_ttl(), || async {
        state
            .providers
            .google_maps
            .geocode(address)
            .await
            .failure_message("Failed to geocode address")
    })
    .await
}

async fn reverse_geocode(
    State(state): State<AppState>,
    query: std::result::Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<Cached<ReverseGeocodedAddress>>> {
    let at = query_params(query)?.coordinate()?;

    let key = format!("reverse_geocode_{}_{}", at.lat, at.lng);
    cached(&state.cache, &key, state.config.cache.maps_ttl(), || async {
        state
            .providers
            .google_maps
            .reverse_geocode(&at)
            .await
            .failure_message("Failed to reverse geocode coordinates")
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Meters
    pub radius: Option<u32>,
}

async fn traffic(
    State(state): State<AppState>,
    query: std::result::Result<Query<TrafficQuery>, QueryRejection>,
) -> Result<Json<Cached<TrafficReport>>> {
    let params = query_params(query)?;
    let at = required_coordinate(params.lat, params.lng, COORDINATES_REQUIRED)?;
    let radius = validate_radius(params.radius.unwrap_or(DEFAULT_TRAFFIC_RADIUS_M))?;

    let key = format!("traffic_{}_{}_{}", at.lat, at.lng, radius);
    cached(&state.cache, &key, state.config.cache.traffic_ttl(), || async {
        state.providers.traffic.snapshot(&at, radius, Utc::now())
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct StaticMapQuery {
    pub center: Option<String>,
    pub zoom: Option<u8>,
    pub size: Option<String>,
    pub maptype: Option<String>,
    pub markers: Option<String>,
}

impl StaticMapQuery {
    fn into_params(self) -> Result<StaticMapParams> {
        let center = self
            .center
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SafeCityError::validation("Center parameter is required"))?;
        let zoom = self.zoom.unwrap_or(13);
        if zoom > MAX_ZOOM {
            return Err(SafeCityError::validation(format!(
                "Zoom must be between 0 and {MAX_ZOOM}"
            )));
        }

        Ok(StaticMapParams {
            center,
            zoom,
            size: self.size.unwrap_or_else(|| "600x400".to_string()),
            maptype: self.maptype.unwrap_or_else(|| "roadmap".to_string()),
            markers: self.markers,
        })
    }
}

async fn static_map(
    State(state): State<AppState>,
    query: std::result::Result<Query<StaticMapQuery>, QueryRejection>,
) -> Result<Json<StaticMap>> {
    let params = query_params(query)?.into_params()?;
    let map = state
        .providers
        .google_maps
        .static_map(params)
        .failure_message("Failed to generate static map URL")?;
    Ok(Json(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(center: Option<&str>, zoom: Option<u8>) -> StaticMapQuery {
        StaticMapQuery {
            center: center.map(str::to_string),
            zoom,
            size: None,
            maptype: None,
            markers: None,
        }
    }

    #[test]
    fn test_static_map_defaults() {
        let params = query(Some("Times Square"), None).into_params().unwrap();
        assert_eq!(params.zoom, 13);
        assert_eq!(params.size, "600x400");
        assert_eq!(params.maptype, "roadmap");
        assert!(params.markers.is_none());
    }

    #[test]
    fn test_static_map_rejections() {
        let err = query(None, None).into_params().unwrap_err();
        assert_eq!(err.user_message(), "Center parameter is required");

        let err = query(Some("Times Square"), Some(22)).into_params().unwrap_err();
        assert_eq!(err.user_message(), "Zoom must be between 0 and 21");
    }
}

//! Google Maps geocoding and static map URLs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{HttpClient, build_url, read_json, send};
use crate::config::UpstreamConfig;
use crate::models::Coordinate;
use crate::{Result, SafeCityError};

const SERVICE: &str = "google_maps";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedAddress {
    pub address: String,
    pub coordinates: Coordinate,
    pub place_id: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocodedAddress {
    pub coordinates: Coordinate,
    pub address: String,
    pub place_id: String,
    /// Passed through unchanged from Google
    pub address_components: Vec<Value>,
}

/// Query parameters of a Static Maps image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMapParams {
    pub center: String,
    pub zoom: u8,
    pub size: String,
    pub maptype: String,
    pub markers: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMap {
    pub url: String,
    pub parameters: StaticMapParams,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct WireGeometry {
    location: WireLocation,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    formatted_address: String,
    geometry: WireGeometry,
    place_id: String,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    address_components: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireGeocode {
    status: String,
    #[serde(default)]
    results: Vec<WireResult>,
}

impl WireGeocode {
    /// First result of an `OK` answer; any other status is a rejection
    fn first_result(self, failure: &str) -> Result<WireResult> {
        if self.status != "OK" {
            warn!("Google geocoding status {}", self.status);
            return Err(SafeCityError::rejected(failure, self.status));
        }
        self.results
            .into_iter()
            .next()
            .ok_or_else(|| SafeCityError::not_found("No results found"))
    }
}

/// URL of a Static Maps image; `key` is left out when none is configured
pub fn static_map_url(base_url: &str, api_key: Option<&str>, params: &StaticMapParams) -> Result<String> {
    let mut query = vec![
        ("center", params.center.clone()),
        ("zoom", params.zoom.to_string()),
        ("size", params.size.clone()),
        ("maptype", params.maptype.clone()),
    ];
    if let Some(key) = api_key {
        query.push(("key", key.to_string()));
    }
    if let Some(markers) = &params.markers {
        query.push(("markers", markers.clone()));
    }

    let base = format!("{}/staticmap", base_url.trim_end_matches('/'));
    Ok(build_url(SERVICE, &base, &query)?.to_string())
}

/// Google Maps Platform client
#[derive(Clone)]
pub struct GoogleMapsClient {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleMapsClient {
    #[must_use]
    pub fn new(client: HttpClient, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.google_maps_base_url.trim_end_matches('/').to_string(),
            api_key: config.google_maps_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SafeCityError::upstream(SERVICE, "Google Maps API key is not configured"))
    }

    async fn geocode_request(&self, param: (&'static str, String)) -> Result<WireGeocode> {
        let url = build_url(
            SERVICE,
            &format!("{}/geocode/json", self.base_url),
            &[param, ("key", self.api_key()?.to_string())],
        )?;
        let response = send(SERVICE, self.client.get(url)).await?;
        read_json(SERVICE, response).await
    }

    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<GeocodedAddress> {
        let result = self
            .geocode_request(("address", address.to_string()))
            .await?
            .first_result("Geocoding failed")?;

        Ok(GeocodedAddress {
            address: result.formatted_address,
            coordinates: Coordinate::new(result.geometry.location.lat, result.geometry.location.lng),
            place_id: result.place_id,
            types: result.types,
        })
    }

    #[instrument(skip(self))]
    pub async fn reverse_geocode(&self, at: &Coordinate) -> Result<ReverseGeocodedAddress> {
        let result = self
            .geocode_request(("latlng", format!("{},{}", at.lat, at.lng)))
            .await?
            .first_result("Reverse geocoding failed")?;

        Ok(ReverseGeocodedAddress {
            coordinates: *at,
            address: result.formatted_address,
            place_id: result.place_id,
            address_components: result.address_components,
        })
    }

    pub fn static_map(&self, params: StaticMapParams) -> Result<StaticMap> {
        Ok(StaticMap {
            url: static_map_url(&self.base_url, self.api_key.as_deref(), &params)?,
            parameters: params,
        })
    }
}

//! Reverse geocoding through OpenStreetMap's Nominatim

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{HttpClient, build_url, read_json, send};
use crate::Result;
use crate::config::UpstreamConfig;
use crate::models::Coordinate;

const SERVICE: &str = "nominatim";
pub const SOURCE: &str = "Nominatim (OpenStreetMap - Free)";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub house_number: Option<String>,
    pub road: Option<String>,
    /// City, falling back to town or village
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub coordinates: Coordinate,
    pub address: Option<String>,
    pub details: AddressDetails,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireReverse {
    display_name: Option<String>,
    #[serde(default)]
    address: WireAddress,
}

impl From<WireAddress> for AddressDetails {
    fn from(address: WireAddress) -> Self {
        Self {
            house_number: address.house_number,
            road: address.road,
            city: address.city.or(address.town).or(address.village),
            state: address.state,
            country: address.country,
            postcode: address.postcode,
        }
    }
}

/// Nominatim client; requests carry the configured User-Agent as the usage policy requires
#[derive(Clone)]
pub struct NominatimClient {
    client: HttpClient,
    base_url: String,
}

impl NominatimClient {
    #[must_use]
    pub fn new(client: HttpClient, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.nominatim_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn reverse(&self, at: &Coordinate) -> Result<ReverseGeocode> {
        let url = build_url(
            SERVICE,
            &format!("{}/reverse", self.base_url),
            &[
                ("format", "json".to_string()),
                ("lat", at.lat.to_string()),
                ("lon", at.lng.to_string()),
                ("addressdetails", "1".to_string()),
            ],
        )?;

        let response = send(SERVICE, self.client.get(url)).await?;
        let data: WireReverse = read_json(SERVICE, response).await?;

        Ok(ReverseGeocode {
            coordinates: *at,
            address: data.display_name,
            details: data.address.into(),
            source: SOURCE.to_string(),
            timestamp: Utc::now(),
        })
    }
}

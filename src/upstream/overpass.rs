//! Nearby OpenStreetMap features through the Overpass API

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::{HttpClient, read_json, send};
use crate::Result;
use crate::config::UpstreamConfig;
use crate::geo::{self, Positioned};
use crate::models::Coordinate;
use crate::validation::validate_tag_key;

const SERVICE: &str = "overpass";
pub const SOURCE: &str = "Overpass API (OpenStreetMap - Free)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: u64,
    pub name: String,
    /// Value of the queried tag, e.g. `cafe` for `amenity`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub coordinates: Coordinate,
    pub tags: BTreeMap<String, String>,
    /// Kilometers from the query point
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlaces {
    pub query: PlaceQuery,
    pub places: Vec<Place>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct WireCenter {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WireElement {
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<WireCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    elements: Vec<WireElement>,
}

struct Candidate {
    id: u64,
    position: Coordinate,
    tags: BTreeMap<String, String>,
}

impl Positioned for Candidate {
    fn position(&self) -> Coordinate {
        self.position
    }
}

impl WireElement {
    /// Nodes carry `lat`/`lon`; ways and relations only a `center`
    fn into_candidate(self) -> Option<Candidate> {
        let position = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
            (_, _, Some(center)) => Coordinate::new(center.lat, center.lon),
            _ => return None,
        };
        Some(Candidate {
            id: self.id,
            position,
            tags: self.tags,
        })
    }
}

/// Overpass QL for nodes, ways and relations carrying `tag` within `radius_m` of `at`
#[must_use]
pub fn build_query(tag: &str, radius_m: u32, at: &Coordinate) -> String {
    let filter = format!("[\"{tag}\"](around:{radius_m},{},{})", at.lat, at.lng);
    format!(
        "[out:json][timeout:25];\n(\n  node{filter};\n  way{filter};\n  relation{filter};\n);\nout center meta;\n"
    )
}

fn nearest_places(elements: Vec<WireElement>, tag: &str, origin: &Coordinate, limit: usize) -> Vec<Place> {
    let candidates: Vec<Candidate> = elements
        .into_iter()
        .filter_map(WireElement::into_candidate)
        .collect();

    geo::nearest(candidates, origin, limit)
        .into_iter()
        .map(|(candidate, distance)| Place {
            id: candidate.id,
            name: candidate
                .tags
                .get("name")
                .cloned()
                .unwrap_or_else(|| "Unnamed".to_string()),
            kind: candidate.tags.get(tag).cloned(),
            coordinates: candidate.position,
            tags: candidate.tags,
            distance,
        })
        .collect()
}

/// Overpass API client
#[derive(Clone)]
pub struct OverpassClient {
    client: HttpClient,
    url: String,
}

impl OverpassClient {
    #[must_use]
    pub fn new(client: HttpClient, config: &UpstreamConfig) -> Self {
        Self {
            client,
            url: config.overpass_url.clone(),
        }
    }

    /// Closest `limit` features carrying `tag`, nearest first
    #[instrument(skip(self))]
    pub async fn nearby(
        &self,
        at: &Coordinate,
        radius_m: u32,
        tag: &str,
        limit: usize,
    ) -> Result<NearbyPlaces> {
        let tag = validate_tag_key(tag)?;
        let query = build_query(tag, radius_m, at);
        debug!("Overpass query: {}", query);

        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(query);
        let response = send(SERVICE, request).await?;
        let data: WireResponse = read_json(SERVICE, response).await?;

        Ok(NearbyPlaces {
            query: PlaceQuery {
                lat: at.lat,
                lng: at.lng,
                radius: radius_m,
                kind: tag.to_string(),
            },
            places: nearest_places(data.elements, tag, at, limit),
            source: SOURCE.to_string(),
            timestamp: Utc::now(),
        })
    }
}

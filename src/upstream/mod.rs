//! Clients for third-party weather, geocoding, places and map APIs
//!
//! All providers share one HTTP client with a request timeout and retry of
//! transient failures (connection errors, 5xx, 429) using exponential backoff.

pub mod google_maps;
pub mod nominatim;
pub mod open_meteo;
pub mod openweather;
pub mod overpass;
pub mod traffic;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Response, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::models::{Coordinate, TrafficObservation, WeatherObservation};
use crate::{Result, SafeCityError};

pub use google_maps::GoogleMapsClient;
pub use nominatim::NominatimClient;
pub use open_meteo::OpenMeteoClient;
pub use openweather::OpenWeatherClient;
pub use overpass::OverpassClient;
pub use traffic::TrafficSimulator;

pub type HttpClient = ClientWithMiddleware;

/// Build the shared HTTP client
pub fn http_client(config: &UpstreamConfig) -> anyhow::Result<HttpClient> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(config.user_agent.as_str())
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Source of current weather for live risk assessment
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_observation(&self, at: &Coordinate) -> Result<WeatherObservation>;
}

/// Source of current traffic for live risk assessment
#[async_trait]
pub trait TrafficProvider: Send + Sync {
    async fn current_traffic(&self, at: &Coordinate) -> Result<TrafficObservation>;
}

/// Weather condition label as reported to the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionLabel {
    pub main: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Every provider client, ready to be shared by request handlers
#[derive(Clone)]
pub struct Providers {
    pub openweather: OpenWeatherClient,
    pub open_meteo: OpenMeteoClient,
    pub nominatim: NominatimClient,
    pub overpass: OverpassClient,
    pub google_maps: GoogleMapsClient,
    pub traffic: TrafficSimulator,
}

impl Providers {
    pub fn from_config(config: &UpstreamConfig, traffic: TrafficSimulator) -> anyhow::Result<Self> {
        let client = http_client(config)?;
        Ok(Self {
            openweather: OpenWeatherClient::new(client.clone(), config),
            open_meteo: OpenMeteoClient::new(client.clone(), config),
            nominatim: NominatimClient::new(client.clone(), config),
            overpass: OverpassClient::new(client.clone(), config),
            google_maps: GoogleMapsClient::new(client, config),
            traffic,
        })
    }

    /// OpenWeatherMap when a key is configured, otherwise the keyless Open-Meteo
    #[must_use]
    pub fn weather_provider(&self) -> Arc<dyn WeatherProvider> {
        if self.openweather.has_key() {
            Arc::new(self.openweather.clone())
        } else {
            Arc::new(self.open_meteo.clone())
        }
    }

    #[must_use]
    pub fn traffic_provider(&self) -> Arc<dyn TrafficProvider> {
        Arc::new(self.traffic.clone())
    }
}

pub(crate) fn build_url(service: &str, base: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(base, params)
        .map_err(|e| SafeCityError::upstream(service, format!("invalid URL {base}: {e}")))
}

pub(crate) async fn send(service: &str, request: reqwest_middleware::RequestBuilder) -> Result<Response> {
    request
        .send()
        .await
        .map_err(|e| SafeCityError::upstream(service, format!("request failed: {e}")))
}

/// Decode a successful JSON body; any other status becomes an upstream error
pub(crate) async fn read_json<T: DeserializeOwned>(service: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SafeCityError::upstream(
            service,
            format!("HTTP {status}: {body}"),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| SafeCityError::upstream(service, format!("invalid response body: {e}")))
}

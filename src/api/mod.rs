//! JSON HTTP API
//!
//! Routers for risk scoring, weather, free-API and maps endpoints. Handlers
//! share an [`AppState`]; proxied responses go through the injected cache and
//! report hits with `"cached": true`.

pub mod free;
pub mod maps;
pub mod risk;
pub mod weather;

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::cache::Cache;
use crate::config::SafeCityConfig;
use crate::models::Coordinate;
use crate::random::SharedRandom;
use crate::upstream::{Providers, TrafficProvider, TrafficSimulator, WeatherProvider};
use crate::{Result, SafeCityError, VERSION};

/// Everything a request handler needs; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SafeCityConfig>,
    pub cache: Cache,
    pub providers: Providers,
    pub weather: Arc<dyn WeatherProvider>,
    pub traffic: Arc<dyn TrafficProvider>,
    pub random: SharedRandom,
    pub tz: Tz,
}

impl AppState {
    /// Wire providers from `config`; predictions and simulated traffic draw from `random`
    pub fn new(config: SafeCityConfig, cache: Cache, random: SharedRandom) -> anyhow::Result<Self> {
        let tz = config.risk.tz()?;
        let providers =
            Providers::from_config(&config.upstream, TrafficSimulator::shared(random.clone()))?;

        Ok(Self {
            weather: providers.weather_provider(),
            traffic: providers.traffic_provider(),
            config: Arc::new(config),
            cache,
            providers,
            random,
            tz,
        })
    }

    /// Replace the weather source used by live assessment
    #[must_use]
    pub fn with_weather_provider(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = weather;
        self
    }

    /// Replace the traffic source used by live assessment
    #[must_use]
    pub fn with_traffic_provider(mut self, traffic: Arc<dyn TrafficProvider>) -> Self {
        self.traffic = traffic;
        self
    }
}

/// A response body, flagged when it was served from the cache
#[derive(Debug, Serialize, Deserialize)]
pub struct Cached<T> {
    #[serde(flatten)]
    pub body: T,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

/// Serve `key` from the cache, or run `fetch` and store its result for `ttl`.
///
/// Cache failures are logged and treated as misses.
pub(crate) async fn cached<T, F, Fut>(
    cache: &Cache,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<Json<Cached<T>>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match cache.get::<T>(key).await {
        Ok(Some(body)) => {
            debug!("Cache hit for {}", key);
            return Ok(Json(Cached { body, cached: true }));
        }
        Ok(None) => debug!("Cache miss for {}", key),
        Err(e) => warn!("Cache read failed for {}: {:#}", key, e),
    }

    let body = fetch().await?;
    if let Err(e) = cache.put(key, &body, ttl).await {
        warn!("Cache write failed for {}: {:#}", key, e);
    }
    Ok(Json(Cached {
        body,
        cached: false,
    }))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for SafeCityError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected: {}", self);
        }

        let details = match &self {
            Self::Rejected { details, .. } => details.clone(),
            _ => None,
        };
        let body = ErrorBody {
            error: self.user_message(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Replace the message of an upstream failure with a route-level one
pub(crate) trait FailureMessage<T> {
    fn failure_message(self, message: &str) -> Result<T>;
}

impl<T> FailureMessage<T> for Result<T> {
    fn failure_message(self, message: &str) -> Result<T> {
        self.map_err(|e| match e {
            SafeCityError::Upstream {
                service,
                message: detail,
            } => {
                warn!(service = %service, "{}: {}", message, detail);
                SafeCityError::upstream(service, message)
            }
            other => other,
        })
    }
}

/// Unwrap query parameters, turning malformed ones into a validation error
pub(crate) fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| SafeCityError::validation(rejection.body_text()))
}

/// Unwrap a JSON body, turning malformed ones into a validation error
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| SafeCityError::validation(rejection.body_text()))
}

/// `lat`/`lng` both present, else the given message; then range-checked
pub(crate) fn required_coordinate(
    lat: Option<f64>,
    lng: Option<f64>,
    missing: &str,
) -> Result<Coordinate> {
    match (lat, lng) {
        (Some(_), Some(_)) => Coordinate::from_parts(lat, lng),
        _ => Err(SafeCityError::validation(missing)),
    }
}

pub(crate) const COORDINATES_REQUIRED: &str = "Latitude and longitude parameters are required";

/// Query string carrying a point
#[derive(Debug, Default, Deserialize)]
pub struct PointQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl PointQuery {
    pub(crate) fn coordinate(&self) -> Result<Coordinate> {
        required_coordinate(self.lat, self.lng, COORDINATES_REQUIRED)
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        version: VERSION,
        timestamp: Utc::now(),
    })
}

/// Every API route, rooted at `/api`
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/risk", risk::router())
        .nest("/weather", weather::router())
        .nest("/free-apis", free::router())
        .nest("/maps", maps::router())
        .with_state(state);

    Router::new().nest("/api", api)
}

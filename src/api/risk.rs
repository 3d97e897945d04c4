//! Risk zones, analysis, predictions and live assessment

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AppState, COORDINATES_REQUIRED, Cached, cached, json_body, query_params, required_coordinate};
use crate::models::{
    Coordinate, PredictionWindow, RiskAssessment, RiskZone, SituationalFactors, TimeOfDay,
    TrafficObservation, WeatherObservation, ZoneSummary,
};
use crate::models::observation::blank_as_none;
use crate::risk::{RiskInputs, ZoneCatalog, assess_risk, predict_risk_window, summarize};
use crate::validation::{validate_hours, validate_radius};
use crate::{Result, SafeCityError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/zones", get(zones))
        .route("/analyze", post(analyze))
        .route("/predictions", get(predictions))
        .route("/assess", get(assess))
}

#[derive(Debug, Deserialize)]
pub struct ZonesQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Meters
    pub radius: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZonesResponse {
    pub zones: Vec<RiskZone>,
    pub summary: ZoneSummary,
    pub timestamp: DateTime<Utc>,
}

async fn zones(
    State(state): State<AppState>,
    query: std::result::Result<Query<ZonesQuery>, QueryRejection>,
) -> Result<Json<Cached<ZonesResponse>>> {
    let params = query_params(query)?;
    let radius = validate_radius(params.radius.unwrap_or(state.config.risk.default_radius_m))?;

    // filtering only applies when both halves of the center are given
    let center = match (params.lat, params.lng) {
        (Some(_), Some(_)) => Some(Coordinate::from_parts(params.lat, params.lng)?),
        _ => None,
    };

    let key = match &center {
        Some(c) => format!("risk_zones_{}_{}_{}", c.lat, c.lng, radius),
        None => format!("risk_zones_all_all_{radius}"),
    };

    cached(&state.cache, &key, state.config.cache.risk_ttl(), || async {
        let now = Utc::now();
        let catalog = ZoneCatalog::seeded(now)?;
        let zones = catalog.query(center.as_ref(), f64::from(radius) / 1000.0);
        info!("Found {} risk zones", zones.len());

        Ok(ZonesResponse {
            summary: ZoneCatalog::summarize(&zones),
            zones,
            timestamp: now,
        })
    })
    .await
}

/// Loosely typed point in a request body; both halves are required
#[derive(Debug, Default, Deserialize)]
pub struct CoordinateInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub coordinates: Option<CoordinateInput>,
    pub weather_data: Option<WeatherObservation>,
    pub traffic_data: Option<TrafficObservation>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub time_of_day: Option<TimeOfDay>,
    pub factors: Option<SituationalFactors>,
}

async fn analyze(
    body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<RiskAssessment>> {
    let request = json_body(body)?;
    let input = request.coordinates.unwrap_or_default();
    let at = required_coordinate(input.lat, input.lng, "Coordinates are required")?;

    let inputs = RiskInputs {
        weather: request.weather_data,
        traffic: request.traffic_data,
        time_of_day: request.time_of_day,
        factors: request.factors,
    };
    Ok(Json(assess_risk(&at, &inputs, Utc::now())?))
}

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub hours: Option<u32>,
}

/// Predictions for the hours after `now`, read in the configured time zone
fn prediction_window(
    state: &AppState,
    at: &Coordinate,
    hours: u32,
    now: DateTime<Utc>,
) -> Result<PredictionWindow> {
    let predictions = {
        let mut random = state
            .random
            .lock()
            .map_err(|_| SafeCityError::internal("prediction random source lock poisoned"))?;
        predict_risk_window(at, hours, now.with_timezone(&state.tz), &mut *random)?
    };
    let summary = summarize(&predictions)?;

    Ok(PredictionWindow {
        location: *at,
        predictions,
        summary,
        timestamp: now,
    })
}

async fn predictions(
    State(state): State<AppState>,
    query: std::result::Result<Query<PredictionsQuery>, QueryRejection>,
) -> Result<Json<Cached<PredictionWindow>>> {
    let params = query_params(query)?;
    let at = required_coordinate(params.lat, params.lng, COORDINATES_REQUIRED)?;
    let hours = validate_hours(
        params
            .hours
            .unwrap_or(state.config.risk.default_prediction_hours),
    )?;

    let key = format!("predictions_{}_{}_{}", at.lat, at.lng, hours);
    cached(&state.cache, &key, state.config.cache.risk_ttl(), || async {
        prediction_window(&state, &at, hours, Utc::now())
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub time_of_day: Option<TimeOfDay>,
}

/// Score a point from live weather and traffic.
///
/// A provider that fails leaves its input out of the score.
async fn assess(
    State(state): State<AppState>,
    query: std::result::Result<Query<AssessQuery>, QueryRejection>,
) -> Result<Json<RiskAssessment>> {
    let params = query_params(query)?;
    let at = required_coordinate(params.lat, params.lng, COORDINATES_REQUIRED)?;
    let now = Utc::now();
    let time_of_day = params
        .time_of_day
        .unwrap_or_else(|| TimeOfDay::from_hour(now.with_timezone(&state.tz).hour()));

    let (weather, traffic) = futures::join!(
        state.weather.current_observation(&at),
        state.traffic.current_traffic(&at)
    );

    let weather = weather
        .inspect_err(|e| warn!("Weather unavailable for live assessment: {}", e))
        .ok();
    let traffic = traffic
        .inspect_err(|e| warn!("Traffic unavailable for live assessment: {}", e))
        .ok();

    let inputs = RiskInputs {
        weather,
        traffic,
        time_of_day: Some(time_of_day),
        factors: None,
    };
    Ok(Json(assess_risk(&at, &inputs, now)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::SafeCityConfig;
    use crate::models::RiskLevel;
    use crate::random::{self, FixedSource};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_prediction_window_follows_base_table() {
        let state = AppState::new(
            SafeCityConfig::default(),
            Cache::in_memory(),
            random::shared(FixedSource(0.5)),
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();

        let window = prediction_window(&state, &Coordinate::new(40.7589, -73.9851), 3, now).unwrap();

        let scores: Vec<u8> = window.predictions.iter().map(|p| p.risk_score).collect();
        assert_eq!(scores, vec![70, 70, 70]);
        assert_eq!(window.summary.peak_risk_time.time, window.predictions[0].time);
        assert_eq!(window.predictions[0].risk_level, RiskLevel::High);
        assert_eq!(window.timestamp, now);
    }

    #[test]
    fn test_analyze_request_accepts_loose_labels() {
        let body = r#"{
            "coordinates": {"lat": 40.7589, "lng": -73.9851},
            "weatherData": {"condition": "RAIN", "windSpeed": 20},
            "trafficData": {"congestionLevel": "gridlock"},
            "timeOfDay": "Evening"
        }"#;
        let request: AnalyzeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.time_of_day, Some(TimeOfDay::Evening));
        assert_eq!(
            request.traffic_data.unwrap().congestion_level,
            Some(crate::models::CongestionLevel::Unknown)
        );
        assert!(request.factors.is_none());
    }
}

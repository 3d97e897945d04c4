//! Integration tests for the SafeCity HTTP API
//!
//! Requests run in-process against the router; no test reaches an upstream
//! provider.

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use safecity::models::{TrafficObservation, WeatherCondition, WeatherObservation};
use safecity::random::{self, FixedSource};
use safecity::cache::MemoryStore;
use safecity::upstream::{TrafficProvider, WeatherProvider};
use safecity::{AppState, Cache, Coordinate, SafeCityConfig, SafeCityError, web};

fn state(sample: f64) -> AppState {
    AppState::new(
        SafeCityConfig::default(),
        Cache::in_memory(),
        random::shared(FixedSource(sample)),
    )
    .unwrap()
}

fn app(sample: f64) -> Router {
    web::app(state(sample))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_health() {
    let app = app(0.5);
    let (status, body) = get(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["version"], safecity::VERSION);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app(0.5);
    let (status, _) = get(&app, "/api/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_zone_lookups_are_released() {
    let mut config = SafeCityConfig::default();
    config.cache.risk_ttl_seconds = 0;
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        config,
        Cache::new(store.clone()),
        random::shared(FixedSource(0.5)),
    )
    .unwrap();
    let app = web::app(state);

    for i in 0..50 {
        let (status, _) = get(&app, &format!("/api/risk/zones?lat=40.{i}&lng=-73.9851")).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn test_zones_all_then_cached() {
    let app = app(0.5);

    let (status, body) = get(&app, "/api/risk/zones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zones"].as_array().unwrap().len(), 5);
    assert_eq!(body["summary"]["total"], 5);
    assert!(body.get("cached").is_none());

    let (status, body) = get(&app, "/api/risk/zones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);
    assert_eq!(body["summary"]["total"], 5);
}

#[tokio::test]
async fn test_zones_far_away_are_empty() {
    let app = app(0.5);
    let (status, body) = get(&app, "/api/risk/zones?lat=0&lng=0&radius=1000").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 0);
    assert_eq!(body["summary"]["averageRiskScore"], 0.0);
}

#[tokio::test]
async fn test_zones_near_downtown() {
    let app = app(0.5);
    let (status, body) = get(&app, "/api/risk/zones?lat=40.7589&lng=-73.9851&radius=100").await;

    assert_eq!(status, StatusCode::OK);
    let zones = body["zones"].as_array().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["name"], "Downtown Intersection");
    assert_eq!(body["summary"]["highRisk"], 1);
}

#[rstest]
#[case("/api/risk/zones?radius=50", "Radius must be at least 100 meters")]
#[case("/api/risk/zones?lat=95&lng=0", "Latitude must be between -90 and 90")]
#[case("/api/risk/predictions?lat=40.7", "Latitude and longitude parameters are required")]
#[case("/api/risk/predictions?lat=40.7&lng=-73.9&hours=49", "Hours must be between 1 and 48")]
#[case("/api/risk/assess?lng=-73.9", "Latitude and longitude parameters are required")]
#[case("/api/weather/current", "Either coordinates (lat, lng) or city parameter is required")]
#[case("/api/weather/current?city=Paris&units=kelvin", "Units must be either metric or imperial")]
#[case("/api/weather/forecast?city=Paris&days=9", "Days must be between 1 and 5")]
#[case("/api/weather/air-quality?lat=40.7", "Latitude and longitude parameters are required")]
#[case("/api/free-apis/weather/current?lng=2.3", "Either coordinates (lat, lng) or city parameter is required")]
#[case("/api/free-apis/geocode", "Address parameter is required")]
#[case("/api/free-apis/reverse-geocode?lat=1", "Latitude and longitude parameters are required")]
#[case("/api/free-apis/places/nearby?lat=40.7&lng=-73.9&type=amenity%22%5D", "Type must be an OpenStreetMap tag key (letters, digits, '_' or ':')")]
#[case("/api/maps/geocode", "Address parameter is required")]
#[case("/api/maps/geocode?address=abc", "Address must be at least 5 characters")]
#[case("/api/maps/reverse-geocode?lng=1", "Latitude and longitude parameters are required")]
#[case("/api/maps/traffic?lat=40.7&lng=200", "Longitude must be between -180 and 180")]
#[case("/api/maps/static-map", "Center parameter is required")]
#[case("/api/maps/static-map?center=NYC&zoom=30", "Zoom must be between 0 and 21")]
#[tokio::test]
async fn test_validation_failures(#[case] uri: &str, #[case] message: &str) {
    let app = app(0.5);
    let (status, body) = get(&app, uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert_eq!(body["error"], message, "{uri}");
}

#[tokio::test]
async fn test_malformed_number_is_bad_request() {
    let app = app(0.5);
    let (status, body) = get(&app, "/api/risk/predictions?lat=abc&lng=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_analyze_full_scenario() {
    let app = app(0.5);
    let request = json!({
        "coordinates": {"lat": 40.7589, "lng": -73.9851},
        "weatherData": {"condition": "Rain", "windSpeed": 20, "visibility": 500},
        "trafficData": {"congestionLevel": "heavy"},
        "timeOfDay": "evening"
    });

    let (status, body) = post_json(&app, "/api/risk/analyze", &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["riskScore"], 83);
    assert_eq!(body["riskLevel"], "high");
    assert_eq!(body["confidence"], 90);
    assert_eq!(body["riskFactors"]["weather"]["score"], 40);
    assert_eq!(body["riskFactors"]["weather"]["rawScore"], 50);
    assert_eq!(body["riskFactors"]["traffic"]["score"], 25);
    assert_eq!(body["riskFactors"]["timeOfDay"]["score"], 18);
    assert!(body["riskFactors"].get("additional").is_none());
    assert_eq!(
        body["recommendations"],
        json!([
            "Avoid this area if possible",
            "Use alternative routes",
            "Reduce speed due to weather conditions",
            "Increase following distance",
            "Expect delays and heavy traffic",
            "Consider using public transportation",
            "Exercise extra caution during peak hours"
        ])
    );
}

#[tokio::test]
async fn test_analyze_without_inputs_is_normal() {
    let app = app(0.5);
    let request = json!({"coordinates": {"lat": 40.7589, "lng": -73.9851}});

    let (status, body) = post_json(&app, "/api/risk/analyze", &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["riskScore"], 0);
    assert_eq!(body["riskLevel"], "low");
    assert_eq!(body["confidence"], 50);
    assert_eq!(body["riskFactors"], json!({}));
    assert_eq!(body["recommendations"], json!(["Normal driving conditions expected"]));
}

#[tokio::test]
async fn test_analyze_treats_empty_labels_as_absent() {
    let app = app(0.5);
    let request = json!({
        "coordinates": {"lat": 40.7589, "lng": -73.9851},
        "weatherData": {"condition": ""},
        "trafficData": {"congestionLevel": ""},
        "timeOfDay": ""
    });

    let (status, body) = post_json(&app, "/api/risk/analyze", &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["riskScore"], 0);
    assert_eq!(body["riskLevel"], "low");
    assert_eq!(body["riskFactors"]["weather"]["score"], 0);
    assert!(body["riskFactors"]["weather"]["condition"].is_null());
    assert_eq!(body["riskFactors"]["traffic"]["score"], 0);
    assert!(body["riskFactors"].get("timeOfDay").is_none());
}

#[rstest]
#[case(json!({}), "Coordinates are required")]
#[case(json!({"coordinates": {"lat": 40.7}}), "Coordinates are required")]
#[case(json!({"coordinates": {"lat": 91, "lng": 0}}), "Latitude must be between -90 and 90")]
#[tokio::test]
async fn test_analyze_rejects_bad_coordinates(#[case] request: Value, #[case] message: &str) {
    let app = app(0.5);
    let (status, body) = post_json(&app, "/api/risk/analyze", &request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], message);
}

#[tokio::test]
async fn test_analyze_rejects_malformed_json() {
    let app = app(0.5);
    let request = Request::post("/api/risk/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_predictions_window_then_cached() {
    let app = app(0.5);

    let (status, body) = get(&app, "/api/risk/predictions?lat=40.7589&lng=-73.9851").await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 6);
    for prediction in predictions {
        let score = prediction["riskScore"].as_u64().unwrap();
        assert!([30, 45, 70, 80].contains(&score), "unexpected score {score}");
    }
    assert_eq!(body["location"], json!({"lat": 40.7589, "lng": -73.9851}));

    let (_, body) = get(&app, "/api/risk/predictions?lat=40.7589&lng=-73.9851").await;
    assert_eq!(body["cached"], true);
}

#[tokio::test]
async fn test_traffic_is_deterministic_with_fixed_source() {
    let app = app(0.75);

    let (status, body) = get(&app, "/api/maps/traffic?lat=40.7589&lng=-73.9851").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trafficLevel"], "heavy");
    assert_eq!(body["congestionScore"], 75);
    assert_eq!(body["averageSpeed"], 65);
    assert_eq!(body["incidents"], 3);
    assert_eq!(body["radius"], 5000);

    let (_, body) = get(&app, "/api/maps/traffic?lat=40.7589&lng=-73.9851").await;
    assert_eq!(body["cached"], true);
}

#[tokio::test]
async fn test_static_map_without_key() {
    let app = app(0.5);
    let (status, body) = get(&app, "/api/maps/static-map?center=Times%20Square&zoom=15").await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://maps.googleapis.com/maps/api/staticmap?center=Times+Square"));
    assert!(url.contains("zoom=15"));
    assert!(!url.contains("key="));
    assert_eq!(body["parameters"]["size"], "600x400");
    assert_eq!(body["parameters"]["maptype"], "roadmap");
}

struct RainyWeather;

#[async_trait]
impl WeatherProvider for RainyWeather {
    async fn current_observation(&self, _at: &Coordinate) -> safecity::Result<WeatherObservation> {
        Ok(WeatherObservation {
            condition: Some(WeatherCondition::Rain),
            wind_speed: Some(3.0),
            visibility: Some(10_000.0),
        })
    }
}

struct BrokenTraffic;

#[async_trait]
impl TrafficProvider for BrokenTraffic {
    async fn current_traffic(&self, _at: &Coordinate) -> safecity::Result<TrafficObservation> {
        Err(SafeCityError::upstream("traffic", "feed offline"))
    }
}

#[tokio::test]
async fn test_assess_degrades_when_a_provider_fails() {
    let state = state(0.5)
        .with_weather_provider(Arc::new(RainyWeather))
        .with_traffic_provider(Arc::new(BrokenTraffic));
    let app = web::app(state);

    let (status, body) = get(&app, "/api/risk/assess?lat=40.7589&lng=-73.9851&timeOfDay=night").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["riskFactors"]["weather"]["score"], 25);
    assert!(body["riskFactors"].get("traffic").is_none());
    assert_eq!(body["riskFactors"]["timeOfDay"]["score"], 25);
    assert_eq!(body["riskScore"], 50);
    assert_eq!(body["riskLevel"], "medium");
    assert_eq!(body["confidence"], 70);
}

#[tokio::test]
async fn test_assess_derives_time_of_day() {
    let state = state(0.5)
        .with_weather_provider(Arc::new(RainyWeather))
        .with_traffic_provider(Arc::new(BrokenTraffic));
    let app = web::app(state);

    let (status, body) = get(&app, "/api/risk/assess?lat=40.7589&lng=-73.9851").await;

    assert_eq!(status, StatusCode::OK);
    let period = body["riskFactors"]["timeOfDay"]["period"].as_str().unwrap();
    assert!(["morning", "afternoon", "evening", "night"].contains(&period));
}

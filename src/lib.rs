//! `SafeCity` - traffic accident risk scoring for the SafeCity AI dashboard
//!
//! This library provides the risk scoring core (distance calculation, heuristic
//! risk assessment, hourly prediction, seeded risk zones) and the JSON HTTP API
//! that wires it to weather, maps and geocoding providers behind a TTL cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod random;
pub mod risk;
pub mod telemetry;
pub mod upstream;
pub mod validation;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use cache::Cache;
pub use config::SafeCityConfig;
pub use error::SafeCityError;
pub use models::{Coordinate, PredictionWindow, RiskAssessment, RiskLevel, RiskPrediction, RiskZone};
pub use random::RandomSource;
pub use risk::{RiskInputs, assess_risk, predict_risk_window};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SafeCityError>;

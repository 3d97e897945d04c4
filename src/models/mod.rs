//! Data models for the SafeCity service
//!
//! This module contains the core domain models organized by concern:
//! - Location: validated coordinates
//! - Observation: weather, traffic, time-of-day and situational inputs
//! - Assessment: scored risk and hourly predictions
//! - Zone: seeded accident hotspots

pub mod assessment;
pub mod location;
pub mod observation;
pub mod zone;

// Re-export all public types for convenient access
pub use assessment::{
    AdditionalFactor, PredictionFactors, PredictionSummary, PredictionWindow, RiskAssessment,
    RiskFactors, RiskLevel, RiskPrediction, TimeFactor, TrafficFactor, Visibility, WeatherFactor,
};
pub use location::Coordinate;
pub use observation::{
    CongestionLevel, SituationalFactors, TimeOfDay, TrafficObservation, WeatherCondition,
    WeatherObservation,
};
pub use zone::{RiskZone, ZoneSummary};

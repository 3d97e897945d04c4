//! Risk assessment and prediction results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CongestionLevel, Coordinate, SituationalFactors, TimeOfDay, WeatherCondition};

/// Categorical risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a final score: high >= 70, medium >= 40, low otherwise
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        Self::from_value(f64::from(score))
    }

    /// Bucket an unrounded value with the same thresholds
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        if value >= 70.0 {
            Self::High
        } else if value >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Weather share of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherFactor {
    /// Points added to the total (capped)
    pub score: u8,
    /// Points before the cap
    pub raw_score: u8,
    pub condition: Option<WeatherCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficFactor {
    pub score: u8,
    pub level: Option<CongestionLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFactor {
    pub score: u8,
    pub period: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFactor {
    /// Points added to the total, clamped into 0..=10
    pub score: u8,
    /// Signed sum before clamping
    pub raw_score: i8,
    pub factors: SituationalFactors,
}

/// Per-input breakdown; an entry exists only when its input was supplied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<AdditionalFactor>,
}

/// Scored risk for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub coordinates: Coordinate,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactors,
    pub recommendations: Vec<String>,
    pub confidence: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Good,
    Reduced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionFactors {
    pub traffic: CongestionLevel,
    pub weather: WeatherCondition,
    pub visibility: Visibility,
}

/// Predicted risk for one hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPrediction {
    pub time: DateTime<Utc>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub factors: PredictionFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSummary {
    pub average_risk: f64,
    pub peak_risk_time: RiskPrediction,
    pub safest_time: RiskPrediction,
}

/// Hourly predictions for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionWindow {
    pub location: Coordinate,
    pub predictions: Vec<RiskPrediction>,
    pub summary: PredictionSummary,
    pub timestamp: DateTime<Utc>,
}

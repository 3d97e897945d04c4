//! Heuristic accident risk scoring
//!
//! Four independent contributions are summed and clamped to 0..=100:
//!
//! | input      | range  | notes                                          |
//! |------------|--------|------------------------------------------------|
//! | weather    | 0..=40 | condition table, +10 wind > 15 m/s, +15 vis < 1 km |
//! | traffic    | 0..=30 | congestion table                               |
//! | time       | 0..=25 | night is 25, above the nominal 20 band         |
//! | additional | 0..=10 | signed flag sum, clamped                       |
//!
//! An input that was not supplied contributes nothing and has no entry in
//! the factor breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{
    AdditionalFactor, CongestionLevel, Coordinate, RiskAssessment, RiskFactors, RiskLevel,
    SituationalFactors, TimeFactor, TimeOfDay, TrafficFactor, TrafficObservation, WeatherCondition,
    WeatherFactor, WeatherObservation,
};

pub const WEATHER_CAP: u8 = 40;
pub const ADDITIONAL_CAP: i8 = 10;
pub const MAX_SCORE: u8 = 100;
pub const HIGH_WIND_MS: f64 = 15.0;
pub const LOW_VISIBILITY_M: f64 = 1000.0;

const BASE_CONFIDENCE: u8 = 50;
const MAX_CONFIDENCE: u8 = 95;

/// Optional scoring inputs for one location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskInputs {
    pub weather: Option<WeatherObservation>,
    pub traffic: Option<TrafficObservation>,
    pub time_of_day: Option<TimeOfDay>,
    pub factors: Option<SituationalFactors>,
}

#[must_use]
pub fn condition_weight(condition: WeatherCondition) -> u8 {
    match condition {
        WeatherCondition::Clear => 5,
        WeatherCondition::Clouds => 10,
        WeatherCondition::Rain => 25,
        WeatherCondition::Snow => 35,
        WeatherCondition::Fog => 30,
        WeatherCondition::Thunderstorm => 40,
        WeatherCondition::Unknown => 15,
    }
}

#[must_use]
pub fn congestion_weight(level: CongestionLevel) -> u8 {
    match level {
        CongestionLevel::Light => 5,
        CongestionLevel::Moderate => 15,
        CongestionLevel::Heavy => 25,
        CongestionLevel::Severe => 30,
        CongestionLevel::Unknown => 10,
    }
}

/// Night (25) sits above the 0..=20 band of the other periods.
#[must_use]
pub fn time_weight(period: TimeOfDay) -> u8 {
    match period {
        TimeOfDay::Morning => 15,
        TimeOfDay::Afternoon => 10,
        TimeOfDay::Evening => 18,
        TimeOfDay::Night => 25,
        TimeOfDay::Unknown => 10,
    }
}

#[must_use]
pub fn weather_contribution(observation: &WeatherObservation) -> WeatherFactor {
    let mut raw = observation.condition.map_or(0, condition_weight);
    if observation.wind_speed.is_some_and(|w| w > HIGH_WIND_MS) {
        raw += 10;
    }
    if observation.visibility.is_some_and(|v| v < LOW_VISIBILITY_M) {
        raw += 15;
    }

    WeatherFactor {
        score: raw.min(WEATHER_CAP),
        raw_score: raw,
        condition: observation.condition,
    }
}

#[must_use]
pub fn traffic_contribution(observation: &TrafficObservation) -> TrafficFactor {
    TrafficFactor {
        score: observation.congestion_level.map_or(0, congestion_weight),
        level: observation.congestion_level,
    }
}

#[must_use]
pub fn time_contribution(period: TimeOfDay) -> TimeFactor {
    TimeFactor {
        score: time_weight(period),
        period,
    }
}

#[must_use]
pub fn additional_contribution(factors: &SituationalFactors) -> AdditionalFactor {
    let mut raw: i8 = 0;
    if factors.construction {
        raw += 5;
    }
    if factors.school_zone {
        raw -= 3;
    }
    if factors.hospital_nearby {
        raw += 2;
    }
    if factors.shopping_area {
        raw += 4;
    }

    AdditionalFactor {
        // clamped into 0..=10, so the cast cannot lose information
        score: raw.clamp(0, ADDITIONAL_CAP) as u8,
        raw_score: raw,
        factors: *factors,
    }
}

/// Ordered advice for a final score and its breakdown
#[must_use]
pub fn recommendations(score: u8, factors: &RiskFactors) -> Vec<String> {
    let mut advice = Vec::new();

    if RiskLevel::from_score(score) == RiskLevel::High {
        advice.push("Avoid this area if possible");
        advice.push("Use alternative routes");
    }
    if factors.weather.as_ref().is_some_and(|w| w.score > 20) {
        advice.push("Reduce speed due to weather conditions");
        advice.push("Increase following distance");
    }
    if factors.traffic.as_ref().is_some_and(|t| t.score > 20) {
        advice.push("Expect delays and heavy traffic");
        advice.push("Consider using public transportation");
    }
    if factors.time_of_day.as_ref().is_some_and(|t| t.score > 15) {
        advice.push("Exercise extra caution during peak hours");
    }
    if advice.is_empty() {
        advice.push("Normal driving conditions expected");
    }

    advice.into_iter().map(String::from).collect()
}

/// How much corroborating input informed the score
#[must_use]
pub fn confidence(inputs: &RiskInputs) -> u8 {
    let mut confidence = BASE_CONFIDENCE;
    if inputs.weather.is_some() {
        confidence += 20;
    }
    if inputs.traffic.is_some() {
        confidence += 20;
    }
    if inputs.factors.is_some() {
        confidence += 10;
    }
    confidence.min(MAX_CONFIDENCE)
}

/// Score the risk at `coordinates` from whatever inputs are available.
///
/// Rejects invalid coordinates before any scoring happens.
pub fn assess_risk(
    coordinates: &Coordinate,
    inputs: &RiskInputs,
    now: DateTime<Utc>,
) -> Result<RiskAssessment> {
    coordinates.validate()?;

    let risk_factors = RiskFactors {
        weather: inputs.weather.as_ref().map(weather_contribution),
        traffic: inputs.traffic.as_ref().map(traffic_contribution),
        time_of_day: inputs.time_of_day.map(time_contribution),
        additional: inputs.factors.as_ref().map(additional_contribution),
    };

    let total: u16 = [
        risk_factors.weather.as_ref().map(|f| f.score),
        risk_factors.traffic.as_ref().map(|f| f.score),
        risk_factors.time_of_day.as_ref().map(|f| f.score),
        risk_factors.additional.as_ref().map(|f| f.score),
    ]
    .into_iter()
    .flatten()
    .map(u16::from)
    .sum();

    let risk_score = u8::try_from(total.min(u16::from(MAX_SCORE))).unwrap_or(MAX_SCORE);
    let recommendations = recommendations(risk_score, &risk_factors);

    Ok(RiskAssessment {
        coordinates: *coordinates,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        risk_factors,
        recommendations,
        confidence: confidence(inputs),
        timestamp: now,
    })
}

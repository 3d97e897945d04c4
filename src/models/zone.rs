//! Seeded accident risk zones

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinate, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelScore {
    pub level: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub quality: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionImpact {
    /// Free-form label, e.g. "windy"; not limited to the scoring conditions
    pub condition: String,
    pub impact: u8,
}

/// Descriptive contributors observed at a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFactors {
    pub traffic: LevelScore,
    pub weather: ConditionImpact,
    pub infrastructure: QualityScore,
    pub lighting: QualityScore,
    pub visibility: LevelScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherImpact {
    pub rain: u8,
    pub snow: u8,
    pub fog: u8,
    pub clear: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficPatterns {
    pub morning: u8,
    pub afternoon: u8,
    pub evening: u8,
    pub night: u8,
}

/// A known accident hotspot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskZone {
    pub id: u32,
    pub name: String,
    pub coordinates: Coordinate,
    pub risk: RiskLevel,
    pub risk_score: u8,
    pub accidents: u32,
    pub description: String,
    pub factors: ZoneFactors,
    pub weather_impact: WeatherImpact,
    pub traffic_patterns: TrafficPatterns,
    pub last_update: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

/// Counts and mean score over a set of zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub total: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub average_risk_score: f64,
}

impl ZoneSummary {
    #[must_use]
    pub fn from_zones(zones: &[RiskZone]) -> Self {
        let count = |level: RiskLevel| zones.iter().filter(|z| z.risk == level).count();
        let average_risk_score = if zones.is_empty() {
            0.0
        } else {
            zones.iter().map(|z| f64::from(z.risk_score)).sum::<f64>() / zones.len() as f64
        };

        Self {
            total: zones.len(),
            high_risk: count(RiskLevel::High),
            medium_risk: count(RiskLevel::Medium),
            low_risk: count(RiskLevel::Low),
            average_risk_score,
        }
    }
}

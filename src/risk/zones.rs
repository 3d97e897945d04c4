//! Seeded risk zone catalog

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::geo::{self, Positioned};
use crate::models::{
    Coordinate, RiskLevel, RiskZone, ZoneSummary,
    zone::{TrafficPatterns, WeatherImpact, ZoneFactors},
};
use crate::{Result, SafeCityError};

const SEED: &str = include_str!("zones.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneRecord {
    id: u32,
    name: String,
    coordinates: Coordinate,
    risk: RiskLevel,
    risk_score: u8,
    accidents: u32,
    description: String,
    factors: ZoneFactors,
    weather_impact: WeatherImpact,
    traffic_patterns: TrafficPatterns,
    minutes_since_update: i64,
    recommendations: Vec<String>,
}

impl ZoneRecord {
    fn into_zone(self, now: DateTime<Utc>) -> RiskZone {
        RiskZone {
            id: self.id,
            name: self.name,
            coordinates: self.coordinates,
            risk: self.risk,
            risk_score: self.risk_score,
            accidents: self.accidents,
            description: self.description,
            factors: self.factors,
            weather_impact: self.weather_impact,
            traffic_patterns: self.traffic_patterns,
            last_update: now - Duration::minutes(self.minutes_since_update),
            recommendations: self.recommendations,
        }
    }
}

impl Positioned for RiskZone {
    fn position(&self) -> Coordinate {
        self.coordinates
    }
}

/// Static set of known hotspots
#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    zones: Vec<RiskZone>,
}

impl ZoneCatalog {
    /// Load the built-in zones, stamping `lastUpdate` relative to `now`
    pub fn seeded(now: DateTime<Utc>) -> Result<Self> {
        let records: Vec<ZoneRecord> = serde_json::from_str(SEED)
            .map_err(|e| SafeCityError::internal(format!("invalid zone seed data: {e}")))?;

        Ok(Self {
            zones: records.into_iter().map(|r| r.into_zone(now)).collect(),
        })
    }

    #[must_use]
    pub fn zones(&self) -> &[RiskZone] {
        &self.zones
    }

    /// All zones, or only those within `radius_km` of `center` (boundary included)
    #[must_use]
    pub fn query(&self, center: Option<&Coordinate>, radius_km: f64) -> Vec<RiskZone> {
        match center {
            Some(center) => geo::within_radius(self.zones.clone(), center, radius_km),
            None => self.zones.clone(),
        }
    }

    #[must_use]
    pub fn summarize(zones: &[RiskZone]) -> ZoneSummary {
        ZoneSummary::from_zones(zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ZoneCatalog {
        ZoneCatalog::seeded(Utc::now()).unwrap()
    }

    fn ids(zones: &[RiskZone]) -> Vec<u32> {
        zones.iter().map(|z| z.id).collect()
    }

    #[test]
    fn test_seed_loads_all_zones() {
        let now = Utc::now();
        let catalog = ZoneCatalog::seeded(now).unwrap();
        assert_eq!(catalog.zones().len(), 5);

        let downtown = &catalog.zones()[0];
        assert_eq!(downtown.name, "Downtown Intersection");
        assert_eq!(downtown.risk, RiskLevel::High);
        assert_eq!(downtown.last_update, now - Duration::minutes(2));
        assert_eq!(catalog.zones()[4].factors.weather.condition, "windy");
    }

    #[test]
    fn test_query_without_center_returns_everything() {
        assert_eq!(ids(&catalog().query(None, 0.0)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_query_filters_by_radius() {
        let center = Coordinate::new(40.7589, -73.9851);
        let catalog = catalog();

        assert_eq!(ids(&catalog.query(Some(&center), 1.0)), vec![1, 3]);
        assert_eq!(ids(&catalog.query(Some(&center), 2.0)), vec![1, 2, 3]);
        assert_eq!(ids(&catalog.query(Some(&center), 3.0)), vec![1, 2, 3, 5]);
        assert_eq!(ids(&catalog.query(Some(&center), 5.0)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_summary_counts_levels() {
        let zones = catalog().query(None, 0.0);
        let summary = ZoneCatalog::summarize(&zones);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.high_risk, 2);
        assert_eq!(summary.medium_risk, 2);
        assert_eq!(summary.low_risk, 1);
        assert!((summary.average_risk_score - 61.6).abs() < 1e-9);
    }

    #[test]
    fn test_summary_of_no_zones_is_zero() {
        let far_away = Coordinate::new(-33.8688, 151.2093);
        let zones = catalog().query(Some(&far_away), 10.0);
        assert!(zones.is_empty());
        let summary = ZoneCatalog::summarize(&zones);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_risk_score, 0.0);
    }
}

//! Simulated traffic feed
//!
//! There is no real traffic provider yet; values are drawn from an injected
//! random source so tests can pin them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TrafficProvider;
use crate::models::{CongestionLevel, Coordinate, TrafficObservation};
use crate::random::{self, RandomSource, SharedRandom};
use crate::{Result, SafeCityError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    pub coordinates: Coordinate,
    /// Meters
    pub radius: u32,
    pub traffic_level: CongestionLevel,
    /// 0..=99
    pub congestion_score: u8,
    /// km/h, 20..=79
    pub average_speed: u8,
    /// 0..=4
    pub incidents: u8,
    pub timestamp: DateTime<Utc>,
}

/// Scale a `[0, 1)` sample to `0..span`
fn scaled(sample: f64, span: u8) -> u8 {
    // samples are clamped to [0, 1) so the product stays below `span`
    (sample.clamp(0.0, 0.999_999) * f64::from(span)).floor() as u8
}

#[derive(Clone)]
pub struct TrafficSimulator {
    random: SharedRandom,
}

impl TrafficSimulator {
    pub fn new(random: impl RandomSource + Send + 'static) -> Self {
        Self::shared(random::shared(random))
    }

    /// Draw from a source also used elsewhere
    #[must_use]
    pub fn shared(random: SharedRandom) -> Self {
        Self { random }
    }

    pub fn snapshot(&self, at: &Coordinate, radius_m: u32, now: DateTime<Utc>) -> Result<TrafficReport> {
        let mut random = self
            .random
            .lock()
            .map_err(|_| SafeCityError::internal("traffic random source lock poisoned"))?;

        let traffic_level = if random.sample() > 0.5 {
            CongestionLevel::Heavy
        } else if random.sample() > 0.3 {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Light
        };

        Ok(TrafficReport {
            coordinates: *at,
            radius: radius_m,
            traffic_level,
            congestion_score: scaled(random.sample(), 100),
            average_speed: scaled(random.sample(), 60) + 20,
            incidents: scaled(random.sample(), 5),
            timestamp: now,
        })
    }
}

#[async_trait]
impl TrafficProvider for TrafficSimulator {
    async fn current_traffic(&self, at: &Coordinate) -> Result<TrafficObservation> {
        let report = self.snapshot(at, 5000, Utc::now())?;
        Ok(TrafficObservation {
            congestion_level: Some(report.traffic_level),
        })
    }
}

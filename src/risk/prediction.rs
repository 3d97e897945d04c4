//! Hour-by-hour risk prediction from a fixed daily pattern

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

use crate::models::{
    CongestionLevel, Coordinate, PredictionFactors, PredictionSummary, RiskLevel, RiskPrediction,
    Visibility, WeatherCondition,
};
use crate::random::RandomSource;
use crate::validation::validate_hours;
use crate::{Result, SafeCityError};

/// Maximum deviation applied around the base risk
pub const PERTURBATION_SPAN: f64 = 20.0;

fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

/// Base risk for a local hour of day (0..=23)
#[must_use]
pub fn base_risk_for_hour(hour: u32) -> u8 {
    match hour {
        7..=9 => 70,
        17..=19 => 80,
        22.. | 0..=5 => 45,
        _ => 30,
    }
}

fn factors_for_hour(hour: u32) -> PredictionFactors {
    PredictionFactors {
        traffic: if is_rush_hour(hour) {
            CongestionLevel::Heavy
        } else {
            CongestionLevel::Moderate
        },
        weather: WeatherCondition::Clear,
        visibility: if hour >= 22 || hour <= 6 {
            Visibility::Reduced
        } else {
            Visibility::Good
        },
    }
}

/// Predict risk for each of the next `hours` hours after `start`.
///
/// The hour-of-day pattern is read in `start`'s time zone. Each base value is
/// shifted by `(sample - 0.5) * 20`, so a source returning 0.5 reproduces the
/// base table exactly. The level comes from the clamped value, the reported
/// score is that value rounded.
pub fn predict_risk_window<Tz: TimeZone, R: RandomSource + ?Sized>(
    coordinates: &Coordinate,
    hours: u32,
    start: DateTime<Tz>,
    random: &mut R,
) -> Result<Vec<RiskPrediction>> {
    coordinates.validate()?;
    let hours = validate_hours(hours)?;

    let predictions = (1..=i64::from(hours))
        .map(|offset| {
            let at = start.clone() + Duration::hours(offset);
            let hour = at.hour();

            let variation = (random.sample() - 0.5) * PERTURBATION_SPAN;
            let raw = (f64::from(base_risk_for_hour(hour)) + variation).clamp(0.0, 100.0);
            // clamped into 0..=100 above
            let risk_score = raw.round() as u8;

            RiskPrediction {
                time: at.with_timezone(&Utc),
                risk_score,
                // leveled before rounding: 39.6 reports 40 but stays low
                risk_level: RiskLevel::from_value(raw),
                factors: factors_for_hour(hour),
            }
        })
        .collect();

    Ok(predictions)
}

/// Average score plus the first highest and first lowest hours
pub fn summarize(predictions: &[RiskPrediction]) -> Result<PredictionSummary> {
    let first = predictions
        .first()
        .ok_or_else(|| SafeCityError::internal("cannot summarize an empty prediction window"))?;

    let mut peak = first;
    let mut safest = first;
    for prediction in &predictions[1..] {
        if prediction.risk_score > peak.risk_score {
            peak = prediction;
        }
        if prediction.risk_score < safest.risk_score {
            safest = prediction;
        }
    }

    let total: f64 = predictions.iter().map(|p| f64::from(p.risk_score)).sum();

    Ok(PredictionSummary {
        average_risk: total / predictions.len() as f64,
        peak_risk_time: peak.clone(),
        safest_time: safest.clone(),
    })
}

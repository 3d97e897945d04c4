//! Coordinate model for geographic positions

use serde::{Deserialize, Serialize};

use crate::{Result, SafeCityError};

/// A point on the earth in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees, -90..=90
    pub lat: f64,
    /// Longitude in decimal degrees, -180..=180
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate without validating it
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from optional parts, rejecting missing or out-of-range values
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Result<Self> {
        let lat = lat.ok_or_else(|| SafeCityError::validation("Latitude is required"))?;
        let lng = lng.ok_or_else(|| SafeCityError::validation("Longitude is required"))?;
        let coordinate = Self { lat, lng };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check both components are inside their valid ranges (NaN is rejected)
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(SafeCityError::validation(
                "Latitude must be between -90 and 90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(SafeCityError::validation(
                "Longitude must be between -180 and 180",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation_bounds() {
        assert!(Coordinate::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(90.0001, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_from_parts_messages() {
        let err = Coordinate::from_parts(None, Some(1.0)).unwrap_err();
        assert_eq!(err.user_message(), "Latitude is required");

        let err = Coordinate::from_parts(Some(1.0), None).unwrap_err();
        assert_eq!(err.user_message(), "Longitude is required");

        let err = Coordinate::from_parts(Some(91.0), Some(1.0)).unwrap_err();
        assert_eq!(err.user_message(), "Latitude must be between -90 and 90");

        let err = Coordinate::from_parts(Some(1.0), Some(200.0)).unwrap_err();
        assert_eq!(err.user_message(), "Longitude must be between -180 and 180");
    }
}

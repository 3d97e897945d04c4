//! Request parameter validation
//!
//! Coordinate checks live on [`Coordinate`](crate::models::Coordinate); the
//! remaining request parameters are checked here with caller-facing messages.

use crate::{Result, SafeCityError};

pub const MIN_RADIUS_M: u32 = 100;
pub const MAX_RADIUS_M: u32 = 50_000;
pub const MAX_PREDICTION_HOURS: u32 = 48;

/// Search radius in meters
pub fn validate_radius(radius_m: u32) -> Result<u32> {
    if radius_m < MIN_RADIUS_M {
        return Err(SafeCityError::validation(
            "Radius must be at least 100 meters",
        ));
    }
    if radius_m > MAX_RADIUS_M {
        return Err(SafeCityError::validation(
            "Radius must not exceed 50000 meters",
        ));
    }
    Ok(radius_m)
}

pub fn validate_city(city: &str) -> Result<&str> {
    let len = city.trim().chars().count();
    if len < 2 {
        return Err(SafeCityError::validation(
            "City name must be at least 2 characters",
        ));
    }
    if len > 100 {
        return Err(SafeCityError::validation(
            "City name must not exceed 100 characters",
        ));
    }
    Ok(city.trim())
}

pub fn validate_address(address: &str) -> Result<&str> {
    let len = address.trim().chars().count();
    if len < 5 {
        return Err(SafeCityError::validation(
            "Address must be at least 5 characters",
        ));
    }
    if len > 200 {
        return Err(SafeCityError::validation(
            "Address must not exceed 200 characters",
        ));
    }
    Ok(address.trim())
}

pub fn validate_hours(hours: u32) -> Result<u32> {
    if hours == 0 || hours > MAX_PREDICTION_HOURS {
        return Err(SafeCityError::validation(format!(
            "Hours must be between 1 and {MAX_PREDICTION_HOURS}"
        )));
    }
    Ok(hours)
}

/// OpenStreetMap tag key used in Overpass queries, e.g. `amenity` or `addr:street`
pub fn validate_tag_key(key: &str) -> Result<&str> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if !valid {
        return Err(SafeCityError::validation(
            "Type must be an OpenStreetMap tag key (letters, digits, '_' or ':')",
        ));
    }
    Ok(key)
}

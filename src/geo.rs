//! Great-circle distance and proximity search

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::Coordinate;

/// Anything with a position on the map
pub trait Positioned {
    fn position(&self) -> Coordinate;
}

impl Positioned for Coordinate {
    fn position(&self) -> Coordinate {
        *self
    }
}

fn to_haversine(coordinate: &Coordinate) -> HaversineLocation {
    HaversineLocation {
        latitude: coordinate.lat,
        longitude: coordinate.lng,
    }
}

/// Haversine distance in kilometers (earth radius 6371 km)
#[must_use]
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    distance(to_haversine(from), to_haversine(to), Units::Kilometers)
}

/// Keep items whose distance to `center` is at most `radius_km`, in input order
#[must_use]
pub fn within_radius<T: Positioned>(items: Vec<T>, center: &Coordinate, radius_km: f64) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| distance_km(center, &item.position()) <= radius_km)
        .collect()
}

/// Rank items by distance to `origin` (closest first) and keep the first `limit`
#[must_use]
pub fn nearest<T: Positioned>(items: Vec<T>, origin: &Coordinate, limit: usize) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .map(|item| {
            let d = distance_km(origin, &item.position());
            (item, d)
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(limit);
    ranked
}

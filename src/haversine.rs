//! Haversine routing provider (fallback when no routing service is available).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than a road network (ignores roads) but always available
//! for places that carry coordinates.

use crate::error::ProviderError;
use crate::model::{ElementStatus, MatrixElement, Measurement, Place};
use crate::traits::RoutingProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Straight-line distance with an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineProvider {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineProvider {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineProvider {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> u32 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round() as u32
    }

    fn estimate(&self, from: (f64, f64), to: (f64, f64)) -> Measurement {
        let km = Self::haversine_km(from, to);
        Measurement::new((km * 1000.0).round() as u32, self.km_to_seconds(km))
    }
}

impl RoutingProvider for HaversineProvider {
    fn distance_duration(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<Measurement, ProviderError> {
        let from = origin
            .coordinates
            .ok_or_else(|| ProviderError::MissingCoordinates(origin.address.clone()))?;
        let to = destination
            .coordinates
            .ok_or_else(|| ProviderError::MissingCoordinates(destination.address.clone()))?;
        Ok(self.estimate(from, to))
    }

    fn distance_duration_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<Vec<Vec<MatrixElement>>, ProviderError> {
        Ok(origins
            .iter()
            .map(|origin| {
                destinations
                    .iter()
                    .map(|destination| match (origin.coordinates, destination.coordinates) {
                        (Some(from), Some(to)) => MatrixElement::ok(self.estimate(from, to)),
                        _ => MatrixElement::unresolved(ElementStatus::NotFound),
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, lat: f64, lng: f64) -> Place {
        Place::new(name).with_coordinates(Some((lat, lng)))
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = HaversineProvider::haversine_km((40.41, -3.70), (40.41, -3.70));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Madrid (40.42, -3.70) to Barcelona (41.39, 2.17)
        // Actual distance ~505 km
        let dist = HaversineProvider::haversine_km((40.42, -3.70), (41.39, 2.17));
        assert!(dist > 480.0 && dist < 530.0, "Madrid to Barcelona should be ~505km, got {}", dist);
    }

    #[test]
    fn test_reasonable_travel_time() {
        let provider = HaversineProvider::new(40.0);
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert_eq!(provider.km_to_seconds(10.0), 900);
    }

    #[test]
    fn test_matrix_marks_missing_coordinates() {
        let provider = HaversineProvider::default();
        let origins = vec![place("a", 40.41, -3.70), Place::new("b")];
        let destinations = vec![place("c", 40.45, -3.68)];
        let grid = provider.distance_duration_matrix(&origins, &destinations).unwrap();

        assert_eq!(grid[0][0].status, ElementStatus::Ok);
        assert!(grid[0][0].measurement.distance_meters > 0);
        assert_eq!(grid[1][0].status, ElementStatus::NotFound);
    }

    #[test]
    fn test_single_pair_without_coordinates_fails() {
        let provider = HaversineProvider::default();
        let result = provider.distance_duration(&Place::new("a"), &place("b", 1.0, 1.0));
        assert!(matches!(result, Err(ProviderError::MissingCoordinates(_))));
    }
}

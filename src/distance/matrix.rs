use std::collections::HashMap;
use std::future::Future;

use crate::config::constant::{EARTH_RADIUS_KM, HAVERSINE_TIME_FACTOR};
use crate::domain::types::{Location, RoutingProfile};
use crate::error::ProviderError;

/// Matrices and per-pair polyline fragments for one ordered location set.
#[derive(Debug, Clone, Default)]
pub struct MatrixData {
    pub distance_matrix: Vec<Vec<f64>>,
    pub time_matrix: Vec<Vec<f64>>,
    pub polyline_fragments: HashMap<(usize, usize), String>,
    pub source: String,
    pub warnings: Vec<String>,
}

/// Capability the engine needs from an upstream mapping service.
///
/// `build_matrices` may absorb individual pair failures internally
/// (substituting great-circle estimates and recording warnings); it
/// returns `Err` only when the upstream is unusable outright, in which
/// case the engine falls back to a pure Haversine matrix. `full_polyline`
/// failures are never fatal; the engine maps them to an empty string.
pub trait MatrixProvider: Send + Sync {
    fn build_matrices(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
    ) -> impl Future<Output = Result<MatrixData, ProviderError>> + Send;

    fn full_polyline(
        &self,
        ordered: &[Location],
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Time estimate paired with a Haversine distance.
pub fn haversine_time_min(distance_km: f64) -> f64 {
    distance_km * HAVERSINE_TIME_FACTOR
}

/// Full fallback matrices when the upstream provider is unavailable.
pub fn haversine_matrices(locations: &[Location]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let n = locations.len();
    let mut distance = vec![vec![0.0; n]; n];
    let mut time = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let km = haversine_km(
                (locations[i].lat, locations[i].lng),
                (locations[j].lat, locations[j].lng),
            );
            distance[i][j] = km;
            time[i][j] = haversine_time_min(km);
        }
    }

    (distance, time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(id: &str, lat: f64, lng: f64) -> Location {
        Location {
            id: id.to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn haversine_one_degree_longitude_at_equator() {
        let km = haversine_km((0.0, 0.0), (0.0, 1.0));
        // One degree of longitude on the equator is ~111.19 km for R=6371.
        assert!((km - 111.19).abs() < 0.1, "got {km}");
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(haversine_km((1.35, 103.82), (1.35, 103.82)), 0.0);
    }

    #[test]
    fn fallback_matrices_are_finite_with_zero_diagonal() {
        let locations = vec![
            loc("a", 1.30, 103.80),
            loc("b", 1.35, 103.85),
            loc("c", 1.40, 103.75),
        ];
        let (d, t) = haversine_matrices(&locations);

        for i in 0..3 {
            assert_eq!(d[i][i], 0.0);
            assert_eq!(t[i][i], 0.0);
            for j in 0..3 {
                assert!(d[i][j].is_finite());
                if i != j {
                    assert!(d[i][j] > 0.0);
                    assert!((t[i][j] - d[i][j] * 1.2).abs() < 1e-12);
                }
            }
        }
    }
}

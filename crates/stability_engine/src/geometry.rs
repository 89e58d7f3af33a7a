//! Great-circle distance and centroid helpers.
//!
//! Centroids are plain arithmetic means of latitude and longitude. At the
//! radii the classifier works with (a few hundred metres at most) the error
//! against a true spherical mean is negligible.

use contracts::{Fix, GeoPoint, EARTH_RADIUS_M};

/// Haversine distance in metres
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance between two points (metres)
#[inline]
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_distance_m(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Distance between two fixes (metres)
#[inline]
pub fn fix_distance(a: &Fix, b: &Fix) -> f64 {
    distance(a.point(), b.point())
}

/// Mean coordinate of `fixes`, `None` when empty
pub fn centroid(fixes: &[Fix]) -> Option<GeoPoint> {
    if fixes.is_empty() {
        return None;
    }
    let n = fixes.len() as f64;
    let (lat, lon) = fixes
        .iter()
        .fold((0.0, 0.0), |(lat, lon), f| (lat + f.latitude, lon + f.longitude));
    Some(GeoPoint::new(lat / n, lon / n))
}

/// Mean accuracy of `fixes`, `None` when empty
pub fn mean_accuracy(fixes: &[Fix]) -> Option<f64> {
    if fixes.is_empty() {
        return None;
    }
    Some(fixes.iter().map(|f| f.accuracy).sum::<f64>() / fixes.len() as f64)
}

/// True iff every fix lies within `radius_m` of the set's own centroid.
///
/// An empty set is not a cluster.
pub fn is_clustered_within(fixes: &[Fix], radius_m: f64) -> bool {
    match centroid(fixes) {
        Some(center) => fixes.iter().all(|f| distance(f.point(), center) <= radius_m),
        None => false,
    }
}

/// Point `north_m` north and `east_m` east of `origin` (flat-earth offset).
#[inline]
pub fn offset_point(origin: GeoPoint, north_m: f64, east_m: f64) -> GeoPoint {
    origin.offset_m(north_m, east_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_identical_points() {
        let p = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(distance(p, p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GeoPoint::new(52.52, 13.405);
        let b = GeoPoint::new(52.53, 13.42);
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_known_value() {
        // One degree of latitude is ~111.2 km on a 6371 km sphere
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn test_offset_point_round_trip_distance() {
        let origin = GeoPoint::new(45.0, 7.0);
        let p = offset_point(origin, 30.0, 40.0);
        let d = distance(origin, p);
        assert!((d - 50.0).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_centroid_mean() {
        let fixes = [Fix::new(0.0, 0.0, 1.0), Fix::new(2.0, 4.0, 3.0)];
        assert_eq!(centroid(&fixes), Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(mean_accuracy(&fixes), Some(2.0));
    }

    #[test]
    fn test_centroid_empty() {
        assert_eq!(centroid(&[]), None);
        assert_eq!(mean_accuracy(&[]), None);
        assert!(!is_clustered_within(&[], 10.0));
    }

    #[test]
    fn test_cluster_check() {
        let origin = GeoPoint::new(10.0, 10.0);
        let tight: Vec<Fix> = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0)]
            .iter()
            .map(|&(n, e)| {
                let p = offset_point(origin, n, e);
                Fix::new(p.latitude, p.longitude, 3.0)
            })
            .collect();
        assert!(is_clustered_within(&tight, 3.0));

        let far = offset_point(origin, 20.0, 0.0);
        let mut loose = tight.clone();
        loose.push(Fix::new(far.latitude, far.longitude, 3.0));
        assert!(!is_clustered_within(&loose, 3.0));
    }
}

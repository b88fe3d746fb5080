//! Great-circle distance and coordinate checks for proximity search.

use crate::error::{Error, Result};
use crate::models::GeoPoint;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Distance between two points in meters using the haversine formula.
pub fn haversine_distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Check that a point is finite and within WGS84 bounds.
pub fn validate_point(point: &GeoPoint) -> Result<()> {
    if !point.longitude.is_finite() || !point.latitude.is_finite() {
        return Err(Error::Validation(
            "Coordinates must be finite numbers".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(Error::Validation(format!(
            "Longitude {} is outside [-180, 180]",
            point.longitude
        )));
    }
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(Error::Validation(format!(
            "Latitude {} is outside [-90, 90]",
            point.latitude
        )));
    }
    Ok(())
}

/// Check a proximity radius.
pub fn validate_radius(max_distance_m: f64) -> Result<()> {
    if !max_distance_m.is_finite() || max_distance_m < 0.0 {
        return Err(Error::Validation(format!(
            "Maximum distance must be a non-negative number of meters, got {}",
            max_distance_m
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(-73.9857, 40.7484);
        assert_eq!(haversine_distance_m(&p, &p), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let d = haversine_distance_m(&a, &b);
        // 1° of arc on the mean sphere is ~111.195 km
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_paris_to_london() {
        let paris = GeoPoint::new(2.3522, 48.8566);
        let london = GeoPoint::new(-0.1276, 51.5072);
        let d = haversine_distance_m(&paris, &london);
        assert!((340_000.0..350_000.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(151.2093, -33.8688);
        let b = GeoPoint::new(174.7633, -36.8485);
        let ab = haversine_distance_m(&a, &b);
        let ba = haversine_distance_m(&b, &a);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_validate_point_bounds() {
        assert!(validate_point(&GeoPoint::new(180.0, -90.0)).is_ok());
        assert!(validate_point(&GeoPoint::new(180.1, 0.0)).is_err());
        assert!(validate_point(&GeoPoint::new(0.0, -90.5)).is_err());
        assert!(validate_point(&GeoPoint::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(0.0).is_ok());
        assert!(validate_radius(10_000.0).is_ok());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }
}

//! Great-circle proximity check against a configured reference point.

use crate::domain::GeoPoint;
use crate::error::AttendanceError;
use serde::Serialize;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    // ---
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Outcome of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityCheck {
    pub accepted: bool,
    pub distance_km: f64,
}

/// An allowed area: every point within `max_distance_km` of `reference`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    // ---
    reference: GeoPoint,
    max_distance_km: f64,
}

impl Geofence {
    // ---
    pub fn new(reference: GeoPoint, max_distance_km: f64) -> Self {
        // ---
        Self {
            reference,
            max_distance_km,
        }
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }

    /// Distance from `observed` to the reference, and whether it is inside the radius.
    pub fn check(&self, observed: GeoPoint) -> ProximityCheck {
        // ---
        let distance_km = haversine_km(observed, self.reference);
        ProximityCheck {
            accepted: distance_km <= self.max_distance_km,
            distance_km,
        }
    }

    /// Like [`Geofence::check`], but rejects with `OutOfRange` naming the distance and limit.
    pub fn verify(&self, observed: GeoPoint) -> Result<ProximityCheck, AttendanceError> {
        // ---
        let check = self.check(observed);
        tracing::debug!("Distance from allowed location: {:.4} km", check.distance_km);

        if check.accepted {
            Ok(check)
        } else {
            Err(AttendanceError::OutOfRange {
                distance_km: check.distance_km,
                max_km: self.max_distance_km,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn campus() -> Geofence {
        Geofence::new(point(30.00850, 77.76386), 10.0)
    }

    #[test]
    fn reference_point_is_always_accepted() {
        for radius in [0.001, 1.0, 10.0, 500.0] {
            let fence = Geofence::new(point(30.00850, 77.76386), radius);
            let check = fence.check(point(30.00850, 77.76386));
            assert_eq!(check.distance_km, 0.0);
            assert!(check.accepted);
        }
        let at_campus = campus().check(point(30.00850, 77.76386));
        assert_eq!(format!("{:.4}", at_campus.distance_km), "0.0000");
    }

    #[test]
    fn far_point_is_rejected_with_distance_and_limit() {
        let err = campus().verify(point(31.0, 78.0)).unwrap_err();
        match err {
            AttendanceError::OutOfRange {
                distance_km,
                max_km,
            } => {
                assert!(distance_km > 10.0);
                assert!((100.0..130.0).contains(&distance_km), "got {distance_km}");
                assert_eq!(max_km, 10.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nearby_point_is_accepted() {
        // ~1.1 km north of the reference
        let check = campus().verify(point(30.01850, 77.76386)).unwrap();
        assert!(check.accepted);
        assert!((check.distance_km - 1.112).abs() < 0.01);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (point(30.0085, 77.76386), point(31.0, 78.0)),
            (point(-33.8688, 151.2093), point(51.5074, -0.1278)),
            (point(89.9, 10.0), point(-89.9, -170.0)),
            (point(0.0, 179.9), point(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn antipodal_points_are_half_circumference_apart() {
        let d = haversine_km(point(0.0, 0.0), point(0.0, 180.0));
        assert!((d - 20015.086).abs() < 0.01, "got {d}");
    }

    #[test]
    fn antimeridian_crossing_is_short() {
        let d = haversine_km(point(0.0, 179.95), point(0.0, -179.95));
        assert!(d < 12.0, "got {d}");
    }
}

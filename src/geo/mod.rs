use crate::models::driver::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

#[cfg(test)]
mod tests {
    use super::haversine_m;
    use crate::models::driver::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lng: 90.4125,
            lat: 23.8103,
        };
        let distance = haversine_m(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lng: -0.1278,
            lat: 51.5074,
        };
        let paris = GeoPoint {
            lng: 2.3522,
            lat: 48.8566,
        };
        let distance = haversine_m(&london, &paris);
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn nearby_dhaka_points_fall_inside_pickup_radius() {
        let pickup = GeoPoint {
            lng: 90.41,
            lat: 23.81,
        };
        let driver = GeoPoint {
            lng: 90.42,
            lat: 23.82,
        };
        let distance = haversine_m(&pickup, &driver);
        assert!(distance > 1_000.0);
        assert!(distance < 5_000.0);
    }
}

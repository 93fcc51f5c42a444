use crate::models::BoundingBox;
use geo::{coord, Intersects, Rect};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two `(lat, lon)` points in degrees
#[inline]
pub fn haversine_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Bounding box of `radius_km` around a centre point
///
/// Used to describe a region's coverage area from a centre and radius.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;
    let lon_delta = radius_km / (111.0 * lat.to_radians().cos().abs());

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box (edges inclusive)
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon >= bbox.min_lon
        && lon <= bbox.max_lon
}

/// Check whether two bounding boxes overlap (shared edges count as overlap)
pub fn bounding_boxes_intersect(a: &BoundingBox, b: &BoundingBox) -> bool {
    to_rect(a).intersects(&to_rect(b))
}

fn to_rect(bbox: &BoundingBox) -> Rect<f64> {
    Rect::new(
        coord! { x: bbox.min_lon, y: bbox.min_lat },
        coord! { x: bbox.max_lon, y: bbox.max_lat },
    )
}

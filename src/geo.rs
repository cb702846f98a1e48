//! Great-circle distance on a 6371 km sphere

/// Haversine distance in kilometers between two points in decimal degrees
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: lat1,
            longitude: lon1,
        },
        haversine::Location {
            latitude: lat2,
            longitude: lon2,
        },
        haversine::Units::Kilometers,
    )
}

//! Landmark identity records and geographic coordinates

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geo;

/// Category given to landmarks recognized outside the catalog
pub const SYNTHESIZED_CATEGORY: &str = "Historic";

static LAST_SYNTHESIZED_ID: AtomicU64 = AtomicU64::new(0);

/// Coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether latitude is within [-90, 90] and longitude within [-180, 180]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in kilometers
    #[must_use]
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        geo::distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Format as a coordinates string
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A known (or recognized) landmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
}

impl Landmark {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, latitude: f64, longitude: f64, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
            category: category.into(),
        }
    }

    /// Landmark recognized from a photo but absent from the catalog.
    ///
    /// Gets a fresh timestamp-derived id and placeholder coordinates `(0, 0)`.
    #[must_use]
    pub fn synthesized(name: impl Into<String>) -> Self {
        Self::new(next_synthesized_id(), name, 0.0, 0.0, SYNTHESIZED_CATEGORY)
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Case-insensitive exact name comparison
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Epoch milliseconds, bumped so ids stay strictly increasing within the process
fn next_synthesized_id() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let previous = LAST_SYNTHESIZED_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(0);
    now.max(previous + 1)
}

/// A landmark with its distance from a search origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedLandmark {
    #[serde(flatten)]
    pub landmark: Landmark,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synthesized_landmark_uses_placeholder_coordinates() {
        let landmark = Landmark::synthesized("Hampi");
        assert_eq!(landmark.name, "Hampi");
        assert_eq!(landmark.coordinates(), Coordinates::new(0.0, 0.0));
        assert_eq!(landmark.category, SYNTHESIZED_CATEGORY);
        assert!(landmark.id > 1_000_000_000_000);
    }

    #[test]
    fn test_synthesized_ids_are_unique() {
        let ids: HashSet<u64> = (0..100).map(|_| Landmark::synthesized("x").id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_name_match_ignores_case_only() {
        let landmark = Landmark::new(1, "Taj Mahal", 27.1751, 78.0421, "Mausoleum");
        assert!(landmark.has_name("taj mahal"));
        assert!(landmark.has_name("TAJ MAHAL"));
        assert!(!landmark.has_name("Taj  Mahal"));
        assert!(!landmark.has_name("Taj"));
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(Coordinates::new(90.0, -180.0).is_valid());
        assert!(!Coordinates::new(90.5, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn test_ranked_landmark_serializes_flat() {
        let ranked = RankedLandmark {
            landmark: Landmark::new(10, "Red Fort", 28.6562, 77.2410, "Fort"),
            distance_km: 4.9,
        };
        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["name"], "Red Fort");
        assert_eq!(value["distanceKm"], 4.9);
    }
}

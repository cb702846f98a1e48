//! Proximity search over the landmark catalog

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::models::{Coordinates, Landmark, RankedLandmark};
use crate::{LandmarkAiError, Result};

/// Result ordering for a nearby search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Distance,
    Name,
}

impl FromStr for SortKey {
    type Err = LandmarkAiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(SortKey::Distance),
            "name" => Ok(SortKey::Name),
            other => Err(LandmarkAiError::validation(format!(
                "unknown sort key '{other}', expected 'distance' or 'name'"
            ))),
        }
    }
}

/// Geographic search functionality
pub struct NearbySearch;

impl NearbySearch {
    /// Landmarks within `radius_km` of `origin`, ordered by `sort`.
    ///
    /// Distance ties keep catalog order.
    #[must_use]
    pub fn find_nearby(
        origin: &Coordinates,
        radius_km: f64,
        catalog: &[Landmark],
        sort: SortKey,
    ) -> Vec<RankedLandmark> {
        let mut found: Vec<RankedLandmark> = catalog
            .iter()
            .map(|landmark| RankedLandmark {
                distance_km: origin.distance_to(&landmark.coordinates()),
                landmark: landmark.clone(),
            })
            .filter(|ranked| ranked.distance_km <= radius_km)
            .collect();

        match sort {
            SortKey::Distance => found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km)),
            SortKey::Name => found.sort_by(|a, b| a.landmark.name.cmp(&b.landmark.name)),
        }

        debug!(
            "Found {} of {} landmarks within {}km of ({})",
            found.len(),
            catalog.len(),
            radius_km,
            origin.format()
        );
        found
    }

    /// Caller-boundary variant: fails when no origin could be acquired
    pub fn find_nearby_from(
        origin: Option<Coordinates>,
        radius_km: f64,
        catalog: &[Landmark],
        sort: SortKey,
    ) -> Result<Vec<RankedLandmark>> {
        let origin = origin.ok_or_else(|| LandmarkAiError::location_unavailable("Location not available."))?;
        Ok(Self::find_nearby(&origin, radius_km, catalog, sort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rstest::rstest;

    fn delhi_gate() -> Coordinates {
        Coordinates::new(28.6129, 77.2295)
    }

    #[test]
    fn test_taj_mahal_within_fifty_km() {
        let catalog = Catalog::builtin();
        let origin = Coordinates::new(27.0, 78.0);
        let found = NearbySearch::find_nearby(&origin, 50.0, catalog.landmarks(), SortKey::Distance);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].landmark.name, "Taj Mahal");
        assert!((found[0].distance_km - 19.8).abs() < 0.2);
    }

    #[rstest]
    #[case(5.0)]
    #[case(50.0)]
    #[case(500.0)]
    #[case(3000.0)]
    fn test_never_exceeds_radius_and_is_sorted_by_distance(#[case] radius: f64) {
        let catalog = Catalog::builtin();
        let found = NearbySearch::find_nearby(&delhi_gate(), radius, catalog.landmarks(), SortKey::Distance);

        assert!(found.iter().all(|r| r.distance_km <= radius));
        assert!(found.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_sorted_by_name() {
        let catalog = Catalog::builtin();
        let found = NearbySearch::find_nearby(&delhi_gate(), 3000.0, catalog.landmarks(), SortKey::Name);

        assert_eq!(found.len(), catalog.landmarks().len());
        assert!(found.windows(2).all(|w| w[0].landmark.name <= w[1].landmark.name));
        assert_eq!(found[0].landmark.name, "Charminar");
    }

    #[test]
    fn test_delhi_cluster_by_distance() {
        let catalog = Catalog::builtin();
        let found = NearbySearch::find_nearby(&delhi_gate(), 20.0, catalog.landmarks(), SortKey::Distance);
        let names: Vec<&str> = found.iter().map(|r| r.landmark.name.as_str()).collect();
        assert_eq!(names, vec!["India Gate", "Red Fort", "Qutub Minar"]);
        assert!(found[0].distance_km.abs() < 1e-9);
    }

    #[test]
    fn test_distance_ties_keep_catalog_order() {
        let catalog = vec![
            Landmark::new(1, "B Twin", 10.0, 10.0, "Test"),
            Landmark::new(2, "A Twin", 10.0, 10.0, "Test"),
        ];
        let found = NearbySearch::find_nearby(&Coordinates::new(10.0, 10.5), 100.0, &catalog, SortKey::Distance);
        assert_eq!(found[0].landmark.id, 1);
        assert_eq!(found[1].landmark.id, 2);
    }

    #[test]
    fn test_boundary_distance_is_included() {
        let catalog = Catalog::builtin();
        let origin = delhi_gate();
        let red_fort = catalog.find_by_name("Red Fort").unwrap();
        let exact = origin.distance_to(&red_fort.coordinates());

        let found = NearbySearch::find_nearby(&origin, exact, catalog.landmarks(), SortKey::Distance);
        assert!(found.iter().any(|r| r.landmark.name == "Red Fort"));
    }

    #[test]
    fn test_missing_origin_is_location_unavailable() {
        let catalog = Catalog::builtin();
        let err = NearbySearch::find_nearby_from(None, 50.0, catalog.landmarks(), SortKey::Distance).unwrap_err();
        assert!(matches!(err, LandmarkAiError::LocationUnavailable { .. }));
    }

    #[rstest]
    #[case("distance", SortKey::Distance)]
    #[case("Name", SortKey::Name)]
    fn test_sort_key_parsing(#[case] input: &str, #[case] expected: SortKey) {
        assert_eq!(input.parse::<SortKey>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_sort_key() {
        assert!("rating".parse::<SortKey>().is_err());
    }
}

//! Fixed, read-only catalog of known landmarks

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::models::Landmark;
use crate::{LandmarkAiError, Result};

/// Ordered, read-only list of known landmarks
#[derive(Debug, Clone)]
pub struct Catalog {
    landmarks: Vec<Landmark>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range coordinates
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self> {
        let mut seen = HashSet::new();
        for landmark in &landmarks {
            if !seen.insert(landmark.id) {
                return Err(LandmarkAiError::validation(format!(
                    "duplicate landmark id {} ({})",
                    landmark.id, landmark.name
                )));
            }
            if !landmark.coordinates().is_valid() {
                return Err(LandmarkAiError::validation(format!(
                    "landmark '{}' has out-of-range coordinates ({})",
                    landmark.name,
                    landmark.coordinates().format()
                )));
            }
        }
        Ok(Self { landmarks })
    }

    /// The ten Indian heritage sites shipped with the application
    #[must_use]
    pub fn builtin() -> Self {
        let landmarks = vec![
            Landmark::new(1, "Taj Mahal", 27.1751, 78.0421, "Mausoleum"),
            Landmark::new(2, "Qutub Minar", 28.5245, 77.1855, "Minaret"),
            Landmark::new(3, "India Gate", 28.6129, 77.2295, "War Memorial"),
            Landmark::new(4, "Gateway of India", 18.9220, 72.8347, "Arch-monument"),
            Landmark::new(5, "Hawa Mahal", 26.9239, 75.8267, "Palace"),
            Landmark::new(6, "Mysore Palace", 12.3052, 76.6552, "Palace"),
            Landmark::new(7, "Victoria Memorial", 22.5448, 88.3426, "Memorial"),
            Landmark::new(8, "Charminar", 17.3616, 78.4747, "Monument"),
            Landmark::new(9, "Konark Sun Temple", 19.8876, 86.0945, "Temple"),
            Landmark::new(10, "Red Fort", 28.6562, 77.2410, "Fort"),
        ];
        Self { landmarks }
    }

    /// Load a catalog from a JSON array of landmark records
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let landmarks: Vec<Landmark> = serde_json::from_str(&raw).map_err(|e| {
            LandmarkAiError::config(format!("Invalid catalog file {}: {e}", path.display()))
        })?;
        info!("Loaded {} landmarks from {}", landmarks.len(), path.display());
        Self::new(landmarks)
    }

    #[must_use]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    #[must_use]
    pub fn find_by_id(&self, id: u64) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.id == id)
    }

    /// Case-insensitive exact name match
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.has_name(name))
    }

    /// Map a recognized name onto the catalog.
    ///
    /// Returns the catalog entry on a case-insensitive exact match, otherwise a
    /// freshly synthesized landmark. The flag is true for catalog entries.
    #[must_use]
    pub fn reconcile(&self, name: &str) -> (Landmark, bool) {
        match self.find_by_name(name) {
            Some(known) => {
                debug!("Recognized '{}' as catalog entry {}", name, known.id);
                (known.clone(), true)
            }
            None => {
                let synthesized = Landmark::synthesized(name);
                debug!("'{}' not in catalog, synthesized id {}", name, synthesized.id);
                (synthesized, false)
            }
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

//! Crowd-level forecast model and level normalization

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{FieldKind, ObjectSchema, Structured};

/// Predicted crowd level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrowdLevel {
    Low,
    Medium,
    High,
}

/// Outcome of checking a raw level string from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelCheck {
    /// One of the canonical literals, verbatim
    Canonical(CrowdLevel),
    /// A canonical literal in the wrong case or with padding, e.g. `"high"`
    Variant,
    /// Anything else; normalized to `Medium`
    Unrecognized,
}

impl CrowdLevel {
    pub const ALL: [CrowdLevel; 3] = [CrowdLevel::Low, CrowdLevel::Medium, CrowdLevel::High];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CrowdLevel::Low => "Low",
            CrowdLevel::Medium => "Medium",
            CrowdLevel::High => "High",
        }
    }

    /// Classify a raw level. Only exact literals are canonical.
    #[must_use]
    pub fn check(raw: &str) -> LevelCheck {
        if let Some(level) = Self::ALL.iter().find(|level| level.as_str() == raw) {
            return LevelCheck::Canonical(*level);
        }
        let folded = raw.trim();
        if Self::ALL
            .iter()
            .any(|level| level.as_str().eq_ignore_ascii_case(folded))
        {
            LevelCheck::Variant
        } else {
            LevelCheck::Unrecognized
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crowd forecast for one landmark on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdForecast {
    pub level: CrowdLevel,
    /// Free-form range, e.g. "5,000 - 8,000"
    pub visitor_count: String,
    pub recommendation: String,
}

/// Crowd forecast as the backend returns it, before level normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCrowdForecast {
    pub level: String,
    pub visitor_count: String,
    pub recommendation: String,
}

impl Structured for RawCrowdForecast {
    fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .required(
                "level",
                FieldKind::String,
                Some("Predicted crowd level. Can be 'Low', 'Medium', or 'High'."),
            )
            .required(
                "visitorCount",
                FieldKind::String,
                Some("Estimated number of visitors, e.g., '5,000 - 8,000'."),
            )
            .required(
                "recommendation",
                FieldKind::String,
                Some("A brief recommendation for visitors based on the prediction."),
            )
    }
}

impl RawCrowdForecast {
    /// Resolve the level; a case variant of a canonical literal is an error,
    /// any other unknown value becomes `Medium`.
    pub fn normalize(self) -> std::result::Result<CrowdForecast, String> {
        let level = match CrowdLevel::check(&self.level) {
            LevelCheck::Canonical(level) => level,
            LevelCheck::Variant => {
                return Err(format!(
                    "crowd level '{}' is not one of Low, Medium, High",
                    self.level
                ));
            }
            LevelCheck::Unrecognized => CrowdLevel::Medium,
        };

        Ok(CrowdForecast {
            level,
            visitor_count: self.visitor_count,
            recommendation: self.recommendation,
        })
    }
}

//! Data models for the `LandmarkAI` library
//!
//! This module contains the core domain models organized by concern:
//! - Landmark: Catalog identity records, coordinates and ranked search results
//! - Detail: Descriptive content about a landmark
//! - Forecast: Crowd-level predictions
//! - Chat: Caller-owned conversation transcripts

pub mod chat;
pub mod detail;
pub mod forecast;
pub mod landmark;

// Re-export all public types for convenient access
pub use chat::{Conversation, ConversationMessage, Sender};
pub use detail::{KeyFact, LandmarkDetail};
pub use forecast::{CrowdForecast, CrowdLevel, RawCrowdForecast};
pub use landmark::{Coordinates, Landmark, RankedLandmark};

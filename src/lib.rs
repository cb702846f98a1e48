//! `LandmarkAI` - identify heritage landmarks from photos and learn about them
//!
//! This library turns generative-model output into validated domain objects:
//! landmark recognition, structured landmark details, crowd forecasts, nearby
//! search over a fixed catalog, and a streaming guide chat.

pub mod api;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod geo;
pub mod models;
pub mod nearby;
pub mod recognition;
pub mod schema;
pub mod web;

// Re-export core types for public API
pub use backend::{ChatChannel, FragmentStream, GeminiBackend, GenerationRequest, GenerativeBackend, InlineImage};
pub use catalog::Catalog;
pub use chat::{APOLOGY_TEXT, ChatSession, ChatSessionManager, ReplyStream, SessionState};
pub use config::LandmarkAiConfig;
pub use error::LandmarkAiError;
pub use generation::StructuredGenerationClient;
pub use geo::distance_km;
pub use models::{
    Conversation, ConversationMessage, Coordinates, CrowdForecast, CrowdLevel, KeyFact, Landmark,
    LandmarkDetail, RankedLandmark, Sender,
};
pub use nearby::{NearbySearch, SortKey};
pub use recognition::{Recognition, RecognitionPipeline, UNKNOWN_LANDMARK};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, LandmarkAiError>;

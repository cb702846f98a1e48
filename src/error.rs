//! Error types and handling for `LandmarkAI`

use thiserror::Error;

/// Main error type for the `LandmarkAI` library
#[derive(Error, Debug)]
pub enum LandmarkAiError {
    /// The backend answered, but with nothing usable
    #[error("Empty response: {message}")]
    EmptyResponse { message: String },

    /// Structured output could not be parsed or did not match its declared shape
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Transport or backend failure (timeout, non-success status, connection)
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// The caller could not supply an origin coordinate
    #[error("Location unavailable: {message}")]
    LocationUnavailable { message: String },

    /// A chat exchange is already in flight on this session
    #[error("Session busy: a reply is still streaming")]
    SessionBusy,

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Unknown landmark or session
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl LandmarkAiError {
    pub fn empty_response<S: Into<String>>(message: S) -> Self {
        Self::EmptyResponse {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn location_unavailable<S: Into<String>>(message: S) -> Self {
        Self::LocationUnavailable {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether offering the user a retry makes sense
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse { .. } | Self::MalformedResponse { .. } | Self::ServiceUnavailable { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            LandmarkAiError::EmptyResponse { .. } => {
                "The assistant returned an empty answer. Please try again.".to_string()
            }
            LandmarkAiError::MalformedResponse { .. } => {
                "The assistant returned data in an unexpected format. Please try again.".to_string()
            }
            LandmarkAiError::ServiceUnavailable { .. } => {
                "Unable to reach the AI service. Please check your connection and try again."
                    .to_string()
            }
            LandmarkAiError::LocationUnavailable { .. } => {
                "Could not get your location. Please enable location services.".to_string()
            }
            LandmarkAiError::SessionBusy => {
                "Please wait for the current reply to finish.".to_string()
            }
            LandmarkAiError::Validation { message } => format!("Invalid input: {message}"),
            LandmarkAiError::NotFound { message } => format!("Not found: {message}"),
            LandmarkAiError::Config { .. } => {
                "Configuration error. Please check your config file and API key.".to_string()
            }
            LandmarkAiError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

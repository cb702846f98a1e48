//! Generative backend port
//!
//! Components never talk to the model directly: they hold an
//! `Arc<dyn GenerativeBackend>` constructed once at startup, which lets tests
//! substitute a scripted backend.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::Result;

pub mod gemini;

pub use gemini::GeminiBackend;

/// Image bytes attached to a request
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A single-turn request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
    /// Declared output shape; when present the backend is asked for JSON
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.image = Some(InlineImage {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Incremental text fragments from a chat exchange
pub type FragmentStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Run one request and return the raw response text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Open a conversation bound to a fixed system instruction
    fn start_chat(&self, system_instruction: &str) -> Arc<dyn ChatChannel>;
}

/// Backend side of one conversation.
///
/// Keeps whatever turn history the backend needs for context; a turn is
/// recorded only once its reply stream has completed.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn send_message_stream(&self, message: &str) -> Result<FragmentStream>;
}

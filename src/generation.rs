//! Structured generation on top of a generative backend
//!
//! Every call either yields a fully typed value or a classified error; raw
//! response text never leaves this module.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::backend::{GenerationRequest, GenerativeBackend};
use crate::models::{CrowdForecast, LandmarkDetail, RawCrowdForecast};
use crate::schema::Structured;
use crate::{LandmarkAiError, Result};

/// Client for free-text and schema-mode requests
#[derive(Clone)]
pub struct StructuredGenerationClient {
    backend: Arc<dyn GenerativeBackend>,
}

impl StructuredGenerationClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn GenerativeBackend> {
        &self.backend
    }

    /// Free-text mode: trimmed response, blank is an error
    pub async fn generate_text(&self, request: GenerationRequest) -> Result<String> {
        let text = self.backend.generate(request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LandmarkAiError::empty_response("the backend returned no text"));
        }
        Ok(text.to_string())
    }

    /// Schema mode: the response must parse as JSON and match `T::schema()`
    pub async fn generate_structured<T: Structured>(&self, prompt: impl Into<String>) -> Result<T> {
        let schema = T::schema();
        let request = GenerationRequest::text(prompt).with_schema(schema.to_json());

        let raw = self.backend.generate(request).await?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LandmarkAiError::malformed("expected structured data, got an empty response"));
        }

        let value: Value = serde_json::from_str(raw).map_err(|e| {
            warn!("Unparsable structured response: {}", raw);
            LandmarkAiError::malformed(format!("response is not valid JSON: {e}"))
        })?;
        schema.validate(&value).map_err(LandmarkAiError::malformed)?;

        serde_json::from_value(value).map_err(|e| LandmarkAiError::malformed(e.to_string()))
    }

    /// Plain-prose description, history, best time to visit and entry fee
    #[instrument(skip(self), fields(landmark = %name))]
    pub async fn describe_landmark_legacy_fields(&self, name: &str) -> Result<String> {
        let prompt = format!(
            "Describe the monument {name} for a visitor. Cover a short description, its history, \
             the best time to visit, and the entry fee. Answer in plain text."
        );
        self.generate_text(GenerationRequest::text(prompt)).await
    }

    #[instrument(skip(self), fields(landmark = %name))]
    pub async fn fetch_landmark_detail(&self, name: &str) -> Result<LandmarkDetail> {
        let prompt = format!("Provide detailed information for the monument: {name}.");
        let detail: LandmarkDetail = self.generate_structured(prompt).await?;
        debug!("Received detail with {} key facts", detail.key_facts.len());
        Ok(detail)
    }

    #[instrument(skip(self), fields(landmark = %name, date = %date))]
    pub async fn fetch_crowd_forecast(&self, name: &str, date: NaiveDate) -> Result<CrowdForecast> {
        let prompt = format!(
            "Predict the crowd level for {name} on the date: {}. \
             Consider factors like day of the week, holidays, and season.",
            date.format("%Y-%m-%d")
        );
        let raw: RawCrowdForecast = self.generate_structured(prompt).await?;
        let original_level = raw.level.clone();
        let forecast = raw.normalize().map_err(LandmarkAiError::malformed)?;
        if forecast.level.as_str() != original_level {
            debug!("Crowd level '{}' normalized to {}", original_level, forecast.level);
        }
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatChannel;
    use crate::models::CrowdLevel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedBackend {
        reply: Result<String>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl FixedBackend {
        fn client(reply: Result<String>) -> (StructuredGenerationClient, Arc<FixedBackend>) {
            let backend = Arc::new(FixedBackend {
                reply,
                seen: Mutex::new(Vec::new()),
            });
            (StructuredGenerationClient::new(backend.clone()), backend)
        }
    }

    #[async_trait]
    impl GenerativeBackend for FixedBackend {
        async fn generate(&self, request: GenerationRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(LandmarkAiError::unavailable(e.to_string())),
            }
        }

        fn start_chat(&self, _system_instruction: &str) -> Arc<dyn ChatChannel> {
            unimplemented!("chat is not used by these tests")
        }
    }

    #[tokio::test]
    async fn test_text_is_trimmed() {
        let (client, _) = FixedBackend::client(Ok("  Taj Mahal\n".to_string()));
        let text = client.generate_text(GenerationRequest::text("name it")).await.unwrap();
        assert_eq!(text, "Taj Mahal");
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_response() {
        let (client, _) = FixedBackend::client(Ok(" \n\t".to_string()));
        let err = client.generate_text(GenerationRequest::text("name it")).await.unwrap_err();
        assert!(matches!(err, LandmarkAiError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_structured_request_carries_schema() {
        let (client, backend) = FixedBackend::client(Ok(
            r#"{"level":"Low","visitorCount":"1,000","recommendation":"Any time."}"#.to_string(),
        ));
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let forecast = client.fetch_crowd_forecast("India Gate", date).await.unwrap();
        assert_eq!(forecast.level, CrowdLevel::Low);

        let seen = backend.seen.lock().unwrap();
        let request = &seen[0];
        assert!(request.prompt.contains("India Gate"));
        assert!(request.prompt.contains("2024-12-25"));
        let schema = request.response_schema.as_ref().unwrap();
        assert_eq!(schema["required"], serde_json::json!(["level", "visitorCount", "recommendation"]));
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let (client, _) = FixedBackend::client(Err(LandmarkAiError::unavailable("timeout")));
        let err = client.fetch_landmark_detail("Red Fort").await.unwrap_err();
        assert!(matches!(err, LandmarkAiError::ServiceUnavailable { .. }));
    }
}

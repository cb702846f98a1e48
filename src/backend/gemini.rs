//! Gemini REST client
//!
//! Single-turn requests go to `models/{model}:generateContent`; chat replies
//! are streamed from `models/{model}:streamGenerateContent?alt=sse`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{ChatChannel, FragmentStream, GenerationRequest, GenerativeBackend};
use crate::config::GeminiConfig;
use crate::{LandmarkAiError, Result};

const USER_AGENT: &str = concat!("LandmarkAI/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Generative backend backed by the Gemini API
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiBackend {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LandmarkAiError::config("Gemini API key is missing. Set gemini.api_key or GEMINI_API_KEY.")
            })?;

        let timeout = Duration::from_secs(config.timeout_seconds.into());
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LandmarkAiError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    #[instrument(
        name = "gemini_generate",
        skip(self, request),
        fields(model = %self.model, image = request.image.is_some(), schema = request.response_schema.is_some())
    )]
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let start_time = Instant::now();
        let body = GenerateContentRequest::single_turn(request);

        let response = post_json(
            &self.client,
            &self.endpoint("generateContent"),
            &self.api_key,
            &body,
            Some(self.timeout),
        )
        .await?;

        let raw = response
            .text()
            .await
            .map_err(|e| LandmarkAiError::unavailable(format!("Failed to read Gemini response: {e}")))?;
        let envelope: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| LandmarkAiError::malformed(format!("Unexpected Gemini response envelope: {e}")))?;
        if let Some(error) = envelope.error {
            return Err(LandmarkAiError::unavailable(error.describe()));
        }

        let text = envelope.text();
        info!(
            "Gemini responded with {} chars in {:.3}s",
            text.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(text)
    }

    fn start_chat(&self, system_instruction: &str) -> Arc<dyn ChatChannel> {
        Arc::new(GeminiChat {
            client: self.client.clone(),
            url: format!("{}?alt=sse", self.endpoint("streamGenerateContent")),
            api_key: self.api_key.clone(),
            system_instruction: Content::text(None, system_instruction),
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

/// One Gemini conversation; owns the turn history sent with each message
struct GeminiChat {
    client: Client,
    url: String,
    api_key: String,
    system_instruction: Content,
    history: Arc<Mutex<Vec<Content>>>,
}

#[async_trait]
impl ChatChannel for GeminiChat {
    #[instrument(name = "gemini_chat", skip(self, message), fields(chars = message.len()))]
    async fn send_message_stream(&self, message: &str) -> Result<FragmentStream> {
        let user_turn = Content::text(Some("user"), message);
        let mut contents = lock_history(&self.history).clone();
        contents.push(user_turn.clone());

        let body = GenerateContentRequest {
            contents,
            system_instruction: Some(self.system_instruction.clone()),
            generation_config: None,
        };

        let response = post_json(&self.client, &self.url, &self.api_key, &body, None).await?;
        debug!("Chat stream opened");

        let state = ReplyState {
            body: response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            reply: String::new(),
            fragments: 0,
            user_turn,
            history: Arc::clone(&self.history),
            body_done: false,
        };

        Ok(futures::stream::unfold(Some(state), next_fragment).boxed())
    }
}

struct ReplyState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    reply: String,
    fragments: usize,
    user_turn: Content,
    history: Arc<Mutex<Vec<Content>>>,
    body_done: bool,
}

impl ReplyState {
    fn enqueue(&mut self, payloads: Vec<String>) -> Result<()> {
        for payload in payloads {
            let chunk: GenerateContentResponse = serde_json::from_str(&payload)
                .map_err(|e| LandmarkAiError::malformed(format!("Unexpected chat stream event: {e}")))?;
            if let Some(error) = chunk.error {
                return Err(LandmarkAiError::unavailable(error.describe()));
            }
            let text = chunk.text();
            if !text.is_empty() {
                self.pending.push_back(text);
            }
        }
        Ok(())
    }

    /// Record the completed exchange so later messages carry it as context
    fn commit(self) {
        debug!("Chat stream complete: {} fragments, {} chars", self.fragments, self.reply.len());
        let model_turn = Content::text(Some("model"), &self.reply);
        let mut history = lock_history(&self.history);
        history.push(self.user_turn);
        history.push(model_turn);
    }
}

async fn next_fragment(state: Option<ReplyState>) -> Option<(Result<String>, Option<ReplyState>)> {
    let mut state = state?;
    loop {
        if let Some(fragment) = state.pending.pop_front() {
            state.reply.push_str(&fragment);
            state.fragments += 1;
            return Some((Ok(fragment), Some(state)));
        }
        if state.body_done {
            state.commit();
            return None;
        }

        match state.body.next().await {
            Some(Ok(chunk)) => {
                let payloads = state.decoder.push(&chunk);
                if let Err(e) = state.enqueue(payloads) {
                    return Some((Err(e), None));
                }
            }
            Some(Err(e)) => {
                warn!("Chat stream interrupted after {} fragments: {}", state.fragments, e);
                return Some((
                    Err(LandmarkAiError::unavailable(format!("Chat stream interrupted: {e}"))),
                    None,
                ));
            }
            None => {
                let tail: Vec<String> = state.decoder.finish().into_iter().collect();
                if let Err(e) = state.enqueue(tail) {
                    return Some((Err(e), None));
                }
                state.body_done = true;
            }
        }
    }
}

fn lock_history(history: &Mutex<Vec<Content>>) -> std::sync::MutexGuard<'_, Vec<Content>> {
    history.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

async fn post_json(
    client: &Client,
    url: &str,
    api_key: &str,
    body: &GenerateContentRequest,
    timeout: Option<Duration>,
) -> Result<Response> {
    let mut request = client.post(url).header(API_KEY_HEADER, api_key).json(body);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            LandmarkAiError::unavailable("Gemini request timed out")
        } else {
            LandmarkAiError::unavailable(format!("Gemini request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Gemini returned {}: {}", status, error_text);
        return Err(LandmarkAiError::unavailable(format!("Gemini API error {status}")));
    }
    Ok(response)
}

/// Splits a `text/event-stream` body into `data:` payloads, tolerating events
/// split across network chunks
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            payloads.extend(Self::payload(&line));
        }
        payloads
    }

    /// Flush a trailing line that had no newline
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::payload(&line)
    }

    fn payload(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);
        (!data.is_empty()).then(|| data.to_string())
    }
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn single_turn(request: GenerationRequest) -> Self {
        let mut parts = Vec::new();
        if let Some(image) = request.image {
            parts.push(Part::InlineData {
                inline_data: Blob {
                    mime_type: image.mime_type,
                    data: BASE64.encode(&image.data),
                },
            });
        }
        parts.push(Part::Text { text: request.prompt });

        Self {
            contents: vec![Content { role: None, parts }],
            system_instruction: None,
            generation_config: request.response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::Text { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, thought parts excluded
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        format!(
            "Gemini API error {}: {}",
            self.code.map_or_else(|| "?".to_string(), |c| c.to_string()),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

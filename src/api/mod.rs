//! JSON/SSE routes over the landmark services

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post},
};
use chrono::{Days, NaiveDate};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::GenerativeBackend;
use crate::catalog::Catalog;
use crate::chat::{ChatSession, ChatSessionManager, SessionState};
use crate::config::{LandmarkAiConfig, SearchConfig};
use crate::generation::StructuredGenerationClient;
use crate::models::{Coordinates, CrowdForecast, Landmark, LandmarkDetail, RankedLandmark};
use crate::nearby::{NearbySearch, SortKey};
use crate::recognition::{Recognition, RecognitionPipeline};
use crate::{LandmarkAiError, Result};

/// Landmarks recognized outside the catalog that are kept addressable by id
const MAX_RECOGNIZED_LANDMARKS: usize = 256;

struct SessionEntry {
    session: Arc<ChatSession>,
    last_used: Instant,
}

/// Services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    recognized: Arc<Mutex<BTreeMap<u64, Landmark>>>,
    generator: StructuredGenerationClient,
    recognizer: RecognitionPipeline,
    chat: ChatSessionManager,
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    session_idle_timeout: Duration,
    search: SearchConfig,
}

impl AppState {
    pub fn new(backend: Arc<dyn GenerativeBackend>, catalog: Catalog, config: &LandmarkAiConfig) -> Self {
        let generator = StructuredGenerationClient::new(Arc::clone(&backend));
        Self {
            catalog: Arc::new(catalog),
            recognized: Arc::new(Mutex::new(BTreeMap::new())),
            recognizer: RecognitionPipeline::new(generator.clone(), config.recognition.max_image_bytes),
            generator,
            chat: ChatSessionManager::new(backend),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_idle_timeout: Duration::from_secs(config.server.session_idle_timeout_seconds),
            search: config.search.clone(),
        }
    }

    /// Catalog entry or a previously recognized landmark
    fn landmark(&self, id: u64) -> Result<Landmark> {
        if let Some(known) = self.catalog.find_by_id(id) {
            return Ok(known.clone());
        }
        lock(&self.recognized)
            .get(&id)
            .cloned()
            .ok_or_else(|| LandmarkAiError::not_found(format!("landmark {id}")))
    }

    /// Keep a synthesized landmark; the oldest is forgotten once the registry is full
    fn remember(&self, landmark: &Landmark) {
        let mut recognized = lock(&self.recognized);
        recognized.insert(landmark.id, landmark.clone());
        while recognized.len() > MAX_RECOGNIZED_LANDMARKS {
            recognized.pop_first();
        }
    }

    fn insert_session(&self, session: ChatSession) {
        let mut sessions = lock(&self.sessions);
        self.evict_idle_sessions(&mut sessions);
        sessions.insert(
            session.id(),
            SessionEntry {
                session: Arc::new(session),
                last_used: Instant::now(),
            },
        );
    }

    fn remove_session(&self, id: Uuid) -> bool {
        lock(&self.sessions).remove(&id).is_some()
    }

    /// Look up a live session and mark it as used
    fn session(&self, id: Uuid) -> Result<Arc<ChatSession>> {
        let mut sessions = lock(&self.sessions);
        self.evict_idle_sessions(&mut sessions);
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| LandmarkAiError::not_found(format!("session {id}")))?;
        entry.last_used = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    /// Drop sessions idle past the timeout; a session with a reply in flight is kept
    fn evict_idle_sessions(&self, sessions: &mut HashMap<Uuid, SessionEntry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.session.state() == SessionState::AwaitingResponse
                || entry.last_used.elapsed() <= self.session_idle_timeout
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle chat sessions", evicted);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/landmarks", get(list_landmarks))
        .route("/landmarks/{id}/detail", get(landmark_detail))
        .route("/landmarks/{id}/description", get(landmark_description))
        .route("/landmarks/{id}/forecast", get(crowd_forecast))
        .route("/identify", post(identify))
        .route("/nearby", get(nearby))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(close_session))
        .route("/sessions/{id}/messages", post(send_message))
        .with_state(state)
}

impl IntoResponse for LandmarkAiError {
    fn into_response(self) -> Response {
        let status = match &self {
            LandmarkAiError::Validation { .. } => StatusCode::BAD_REQUEST,
            LandmarkAiError::NotFound { .. } => StatusCode::NOT_FOUND,
            LandmarkAiError::SessionBusy => StatusCode::CONFLICT,
            LandmarkAiError::LocationUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LandmarkAiError::EmptyResponse { .. } | LandmarkAiError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            LandmarkAiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LandmarkAiError::Config { .. } | LandmarkAiError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.user_message(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}

async fn list_landmarks(State(state): State<AppState>) -> Json<Vec<Landmark>> {
    Json(state.catalog.landmarks().to_vec())
}

async fn landmark_detail(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<LandmarkDetail>> {
    let landmark = state.landmark(id)?;
    let detail = state.generator.fetch_landmark_detail(&landmark.name).await?;
    Ok(Json(detail))
}

#[derive(Serialize)]
struct DescriptionResponse {
    name: String,
    description: String,
}

async fn landmark_description(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DescriptionResponse>> {
    let landmark = state.landmark(id)?;
    let description = state.generator.describe_landmark_legacy_fields(&landmark.name).await?;
    Ok(Json(DescriptionResponse {
        name: landmark.name,
        description,
    }))
}

#[derive(Deserialize)]
struct ForecastQuery {
    date: Option<String>,
}

async fn crowd_forecast(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<CrowdForecast>> {
    let landmark = state.landmark(id)?;
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| LandmarkAiError::validation(format!("'{raw}' is not a YYYY-MM-DD date")))?,
        None => chrono::Local::now().date_naive() + Days::new(1),
    };
    let forecast = state.generator.fetch_crowd_forecast(&landmark.name, date).await?;
    Ok(Json(forecast))
}

async fn identify(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Recognition>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LandmarkAiError::validation(format!("invalid upload: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| LandmarkAiError::validation(format!("invalid upload: {e}")))?;

        let recognition = state.recognizer.recognize(&bytes, &mime_type, &state.catalog).await?;
        if !recognition.in_catalog {
            state.remember(&recognition.landmark);
        }
        return Ok(Json(recognition));
    }
    Err(LandmarkAiError::validation("missing 'image' field"))
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    radius_km: Option<f64>,
    sort: Option<String>,
}

async fn nearby(State(state): State<AppState>, Query(query): Query<NearbyQuery>) -> Result<Json<Vec<RankedLandmark>>> {
    let radius_km = query.radius_km.unwrap_or(state.search.default_radius_km);
    if !(radius_km > 0.0 && radius_km <= state.search.max_radius_km) {
        return Err(LandmarkAiError::validation(format!(
            "radius must be between 0 and {} km",
            state.search.max_radius_km
        )));
    }
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<SortKey>()?,
        None => SortKey::default(),
    };

    let origin = query.lat.zip(query.lon).map(|(lat, lon)| Coordinates::new(lat, lon));
    if let Some(origin) = origin.filter(|o| !o.is_valid()) {
        return Err(LandmarkAiError::validation(format!(
            "coordinates out of range: {}",
            origin.format()
        )));
    }

    let found = NearbySearch::find_nearby_from(origin, radius_km, state.catalog.landmarks(), sort)?;
    Ok(Json(found))
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    focus: Option<String>,
}

#[derive(Serialize)]
struct CreateSessionResponse {
    id: Uuid,
    greeting: String,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.chat.create_session(request.focus.as_deref());
    let response = CreateSessionResponse {
        id: session.id(),
        greeting: session.greeting(),
    };
    state.insert_session(session);
    (StatusCode::CREATED, Json(response))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !state.remove_session(id) {
        return Err(LandmarkAiError::not_found(format!("session {id}")));
    }
    info!(session = %id, "Chat session closed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let session = state.session(id)?;
    let reply = state.chat.send(&session, &request.text)?;

    let events = reply
        .map(|fragment| Ok(Event::default().data(fragment)))
        .chain(futures::stream::once(async { Ok(Event::default().event("done").data("")) }));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

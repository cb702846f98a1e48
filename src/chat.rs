//! Guide chat sessions with streamed replies
//!
//! A session is bound to one system framing for its whole life and admits a
//! single exchange at a time. Replies are lazy fragment streams; a backend
//! failure ends the stream with [`APOLOGY_TEXT`] instead of an error, so text
//! already shown to the user is kept.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{ChatChannel, FragmentStream, GenerativeBackend};
use crate::{LandmarkAiError, Result};

/// Final fragment emitted when an exchange fails
pub const APOLOGY_TEXT: &str = "I'm sorry, I encountered an error. Please try again.";

const GUIDE_PERSONA: &str =
    "You are a friendly and knowledgeable AI tour guide specializing in Indian heritage sites.";
const GUIDE_RULES: &str = "Answer questions concisely and engagingly. Do not make up facts.";

const CREATED: u8 = 0;
const AWAITING_RESPONSE: u8 = 1;
const IDLE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No exchange has happened yet
    Created,
    /// A reply is streaming; further sends are rejected
    AwaitingResponse,
    Idle,
}

impl SessionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            CREATED => SessionState::Created,
            AWAITING_RESPONSE => SessionState::AwaitingResponse,
            _ => SessionState::Idle,
        }
    }
}

/// Handle to one conversation with the guide
pub struct ChatSession {
    id: Uuid,
    focus: Option<String>,
    system_instruction: String,
    channel: Arc<dyn ChatChannel>,
    state: Arc<AtomicU8>,
}

impl ChatSession {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Landmark the conversation is about, if any
    #[must_use]
    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Opening assistant line for a fresh conversation
    #[must_use]
    pub fn greeting(&self) -> String {
        match &self.focus {
            Some(name) => format!("Hello! I'm your AI guide. How can I help you with your visit to {name}?"),
            None => "Hello! I'm your AI guide for Indian heritage sites. Ask me anything!".to_string(),
        }
    }

    fn begin_exchange(&self) -> Result<ExchangeGuard> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != AWAITING_RESPONSE).then_some(AWAITING_RESPONSE)
            })
            .map_err(|_| LandmarkAiError::SessionBusy)?;
        Ok(ExchangeGuard {
            state: Arc::clone(&self.state),
            released: false,
        })
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("focus", &self.focus)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Creates sessions and runs exchanges on them
#[derive(Clone)]
pub struct ChatSessionManager {
    backend: Arc<dyn GenerativeBackend>,
}

impl ChatSessionManager {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// System framing for a general or landmark-focused guide
    #[must_use]
    pub fn system_instruction(focus: Option<&str>) -> String {
        match focus {
            Some(name) => format!("{GUIDE_PERSONA} You are currently helping a visitor at {name}. {GUIDE_RULES}"),
            None => format!("{GUIDE_PERSONA} {GUIDE_RULES}"),
        }
    }

    /// Start a conversation; a blank focus counts as none
    pub fn create_session(&self, focus: Option<&str>) -> ChatSession {
        let focus = focus.map(str::trim).filter(|name| !name.is_empty());
        let system_instruction = Self::system_instruction(focus);
        let session = ChatSession {
            id: Uuid::new_v4(),
            focus: focus.map(str::to_string),
            channel: self.backend.start_chat(&system_instruction),
            system_instruction,
            state: Arc::new(AtomicU8::new(CREATED)),
        };
        info!(session = %session.id, focus = ?session.focus, "Chat session created");
        session
    }

    /// Send a message and stream the reply.
    ///
    /// The session stays in `AwaitingResponse` until the returned stream ends
    /// or is dropped.
    pub fn send(&self, session: &ChatSession, text: &str) -> Result<ReplyStream> {
        if text.trim().is_empty() {
            return Err(LandmarkAiError::validation("message text is empty"));
        }
        let guard = session.begin_exchange()?;
        debug!(session = %session.id, chars = text.len(), "Chat exchange started");

        let phase = Phase::Opening {
            channel: Arc::clone(&session.channel),
            message: text.to_string(),
        };
        Ok(ReplyStream {
            inner: futures::stream::unfold(phase, advance).boxed(),
            guard,
        })
    }
}

/// Fragments of one assistant reply, in arrival order.
///
/// Finite and not restartable. Ends with [`APOLOGY_TEXT`] if the exchange fails.
pub struct ReplyStream {
    inner: BoxStream<'static, String>,
    guard: ExchangeGuard,
}

impl Stream for ReplyStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        let item = futures::ready!(this.inner.poll_next_unpin(cx));
        if item.is_none() {
            this.guard.release();
        }
        Poll::Ready(item)
    }
}

/// Returns the session to `Idle` exactly once
struct ExchangeGuard {
    state: Arc<AtomicU8>,
    released: bool,
}

impl ExchangeGuard {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.store(IDLE, Ordering::SeqCst);
        }
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        self.release();
    }
}

enum Phase {
    Opening {
        channel: Arc<dyn ChatChannel>,
        message: String,
    },
    Streaming {
        fragments: FragmentStream,
        delivered: usize,
    },
    Finished,
}

async fn advance(phase: Phase) -> Option<(String, Phase)> {
    let (mut fragments, mut delivered) = match phase {
        Phase::Finished => return None,
        Phase::Opening { channel, message } => match channel.send_message_stream(&message).await {
            Ok(fragments) => (fragments, 0),
            Err(e) => {
                warn!("Failed to open chat stream: {}", e);
                return Some((APOLOGY_TEXT.to_string(), Phase::Finished));
            }
        },
        Phase::Streaming { fragments, delivered } => (fragments, delivered),
    };

    loop {
        match fragments.next().await {
            Some(Ok(fragment)) if fragment.is_empty() => continue,
            Some(Ok(fragment)) => {
                delivered += 1;
                return Some((fragment, Phase::Streaming { fragments, delivered }));
            }
            Some(Err(e)) => {
                warn!("Chat stream failed after {} fragments: {}", delivered, e);
                return Some((APOLOGY_TEXT.to_string(), Phase::Finished));
            }
            None => {
                debug!("Chat reply complete after {} fragments", delivered);
                return None;
            }
        }
    }
}

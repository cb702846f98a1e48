//! Scripted in-memory backend shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use landmarkai::{ChatChannel, FragmentStream, GenerationRequest, GenerativeBackend, LandmarkAiError, Result};

/// How one chat exchange plays out
#[derive(Debug, Clone)]
pub enum ChatScript {
    /// Stream these fragments, then complete normally
    Fragments(Vec<&'static str>),
    /// Stream these fragments, then fail mid-stream
    FailAfter(Vec<&'static str>),
    /// Fail before any fragment is produced
    FailToOpen,
}

#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    chat_scripts: Arc<Mutex<VecDeque<ChatScript>>>,
    chat_messages: Arc<Mutex<Vec<String>>>,
    system_instructions: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose next single-turn request returns `text`
    pub fn replying(text: &str) -> Arc<Self> {
        let backend = Self::new();
        backend.push_reply(text);
        backend
    }

    pub fn push_reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn push_error(&self, error: LandmarkAiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn push_chat(&self, script: ChatScript) {
        self.chat_scripts.lock().unwrap().push_back(script);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_messages(&self) -> Vec<String> {
        self.chat_messages.lock().unwrap().clone()
    }

    pub fn system_instructions(&self) -> Vec<String> {
        self.system_instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LandmarkAiError::unavailable("no scripted reply")))
    }

    fn start_chat(&self, system_instruction: &str) -> Arc<dyn ChatChannel> {
        self.system_instructions
            .lock()
            .unwrap()
            .push(system_instruction.to_string());
        Arc::new(ScriptedChannel {
            scripts: Arc::clone(&self.chat_scripts),
            messages: Arc::clone(&self.chat_messages),
        })
    }
}

struct ScriptedChannel {
    scripts: Arc<Mutex<VecDeque<ChatScript>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ChatChannel for ScriptedChannel {
    async fn send_message_stream(&self, message: &str) -> Result<FragmentStream> {
        self.messages.lock().unwrap().push(message.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ChatScript::FailToOpen);

        match script {
            ChatScript::Fragments(fragments) => {
                Ok(futures::stream::iter(fragments.into_iter().map(|f| Ok(f.to_string()))).boxed())
            }
            ChatScript::FailAfter(fragments) => {
                let failure = futures::stream::once(async { Err(LandmarkAiError::unavailable("connection reset")) });
                Ok(futures::stream::iter(fragments.into_iter().map(|f| Ok(f.to_string())))
                    .chain(failure)
                    .boxed())
            }
            ChatScript::FailToOpen => Err(LandmarkAiError::unavailable("HTTP 503")),
        }
    }
}

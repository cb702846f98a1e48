//! Conversation transcript owned by the caller of a chat session

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub sender: Sender,
    pub text: String,
    /// Timestamp-derived key, unique within the conversation
    pub created_at: String,
    /// False while an assistant reply is still streaming in
    pub complete: bool,
}

/// Ordered message history for one chat session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    #[serde(skip)]
    last_stamp: i64,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the assistant's opening line
    #[must_use]
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        let key = conversation.next_key(Sender::Assistant);
        conversation.messages.push(ConversationMessage {
            sender: Sender::Assistant,
            text: greeting.into(),
            created_at: key,
            complete: true,
        });
        conversation
    }

    #[must_use]
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> String {
        let key = self.next_key(Sender::User);
        self.messages.push(ConversationMessage {
            sender: Sender::User,
            text: text.into(),
            created_at: key.clone(),
            complete: true,
        });
        key
    }

    /// Open an empty assistant message that fragments will be appended to
    pub fn begin_reply(&mut self) -> String {
        let key = self.next_key(Sender::Assistant);
        self.messages.push(ConversationMessage {
            sender: Sender::Assistant,
            text: String::new(),
            created_at: key.clone(),
            complete: false,
        });
        key
    }

    /// Append a fragment to a streaming reply. Returns false if the key is
    /// unknown or the reply has already been sealed.
    pub fn append_fragment(&mut self, key: &str, fragment: &str) -> bool {
        match self.open_reply(key) {
            Some(message) => {
                message.text.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Seal a streaming reply; later fragments are refused
    pub fn finish_reply(&mut self, key: &str) -> bool {
        match self.open_reply(key) {
            Some(message) => {
                message.complete = true;
                true
            }
            None => false,
        }
    }

    fn open_reply(&mut self, key: &str) -> Option<&mut ConversationMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.created_at == key && m.sender == Sender::Assistant && !m.complete)
    }

    fn next_key(&mut self, sender: Sender) -> String {
        let now = Utc::now().timestamp_micros();
        self.last_stamp = now.max(self.last_stamp + 1);
        match sender {
            Sender::User => format!("user-{}", self.last_stamp),
            Sender::Assistant => format!("bot-{}", self.last_stamp),
        }
    }
}

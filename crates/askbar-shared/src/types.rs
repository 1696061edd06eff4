use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::TEMP_ID_PREFIX;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Server-assigned chat identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Message identifier. Either server-assigned or a local placeholder
/// (`temp-<millis>-<seq>`) that only lives until the send settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Fresh placeholder id.  Unique within the process even when several
    /// are created in the same millisecond.
    pub fn temporary() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{TEMP_ID_PREFIX}{}-{seq}",
            Utc::now().timestamp_millis()
        ))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A citation attached to an assistant answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub content: String,
    pub role: Role,
    /// RFC 3339 timestamp as reported by the server.
    pub timestamp: String,
    #[serde(default)]
    pub likes: bool,
    #[serde(default)]
    pub dislikes: bool,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Name the server suggests for the chat after this answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_new_name: Option<String>,
    /// Reference to an attached image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Reference to an attached audio recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl Message {
    /// Local stand-in for a user message that has not been confirmed yet.
    pub fn pending_user(id: MessageId, chat_id: ChatId, content: impl Into<String>) -> Self {
        Self {
            id,
            chat_id,
            content: content.into(),
            role: Role::User,
            timestamp: Utc::now().to_rfc3339(),
            likes: false,
            dislikes: false,
            sources: Vec::new(),
            chat_new_name: None,
            image: None,
            audio: None,
        }
    }
}

/// User feedback on an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    /// `(likes, dislikes)` after the feedback is applied.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Feedback::Like => (true, false),
            Feedback::Dislike => (false, true),
        }
    }

    /// Path segment of the rating endpoint.
    pub fn as_path(self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A conversation.
///
/// `messages` is `None` until the messages have been fetched; `Some(vec![])`
/// means the chat is known to be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

// ---------------------------------------------------------------------------
// Errors reported by the API
// ---------------------------------------------------------------------------

/// Body of a 400 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub status_code: u16,
    pub detail: String,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

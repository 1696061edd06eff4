//! In-memory chat state, mirrored to durable storage.
//!
//! [`ChatCache`] is the single source of truth for the chat list and each
//! chat's messages.  Every mutation rebuilds the affected slice (the chat
//! list, or one chat's message list) with the matched element replaced by an
//! updated value, preserving order.  After any change to `chats` the list is
//! written back to storage, but only once [`ChatCache::hydrate`] has run, so
//! early mutations never overwrite the stored snapshot.

use askbar_shared::{Chat, ChatId, Feedback, Message, MessageId};

use crate::database::Database;
use crate::snapshot::PersistedChats;

/// Central chat state.
///
/// Only `chats` is persisted; the remaining fields are session-scoped.
pub struct ChatCache {
    chats: Vec<Chat>,
    loading: bool,
    /// Last recorded failure.  A new failure overwrites the previous one.
    error: Option<String>,
    /// Partially received assistant output of the send in progress.
    streaming: String,
    current_chat_id: Option<ChatId>,
    hydrated: bool,
    storage: Option<Database>,
}

impl ChatCache {
    /// Create an empty, not yet hydrated cache backed by `storage`.
    pub fn new(storage: Option<Database>) -> Self {
        Self {
            chats: Vec::new(),
            loading: false,
            error: None,
            streaming: String::new(),
            current_chat_id: None,
            hydrated: false,
            storage,
        }
    }

    /// A cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    // ------------------------------------------------------------------
    // Hydration
    // ------------------------------------------------------------------

    /// Read the persisted snapshot back into memory.
    ///
    /// Runs at most once; later calls return immediately.  An unreadable
    /// snapshot is logged and discarded so the hydrated flag still flips.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }

        if let Some(db) = &self.storage {
            match db.load_chats() {
                Ok(Some(snapshot)) => {
                    tracing::info!(chats = snapshot.chats.len(), "rehydrated chat state");
                    self.chats = snapshot.chats;
                }
                Ok(None) => tracing::debug!("no persisted chat state"),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable chat state");
                    if let Err(e) = db.clear_chats() {
                        tracing::warn!(error = %e, "failed to discard chat state");
                    }
                }
            }
        }

        self.hydrated = true;
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, id: &ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.id == id)
    }

    /// Find a message by id across all chats.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.chats
            .iter()
            .filter_map(|c| c.messages.as_deref())
            .flatten()
            .find(|m| &m.id == id)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn streaming_text(&self) -> &str {
        &self.streaming
    }

    pub fn current_chat_id(&self) -> Option<&ChatId> {
        self.current_chat_id.as_ref()
    }

    // ------------------------------------------------------------------
    // Operation status
    // ------------------------------------------------------------------

    /// Mark an operation as started: loading on, previous error cleared.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Mark an operation as settled successfully.
    pub fn finish(&mut self) {
        self.loading = false;
    }

    /// Record a failure and clear the loading flag.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn set_current_chat(&mut self, id: Option<ChatId>) {
        self.current_chat_id = id;
    }

    // ------------------------------------------------------------------
    // Streaming buffer
    // ------------------------------------------------------------------

    pub fn append_stream(&mut self, delta: &str) {
        self.streaming.push_str(delta);
    }

    pub fn clear_stream(&mut self) {
        self.streaming.clear();
    }

    // ------------------------------------------------------------------
    // Chat list
    // ------------------------------------------------------------------

    /// Replace the whole chat list.
    pub fn replace_chats(&mut self, chats: Vec<Chat>) {
        self.chats = chats;
        self.persist();
    }

    /// Append a chat, replacing an existing entry with the same id so the
    /// chat appears exactly once.
    pub fn push_chat(&mut self, chat: Chat) {
        let mut chats: Vec<Chat> = std::mem::take(&mut self.chats)
            .into_iter()
            .filter(|c| c.id != chat.id)
            .collect();
        chats.push(chat);
        self.chats = chats;
        self.persist();
    }

    /// Remove a chat.  Returns `true` if it was present.
    pub fn remove_chat(&mut self, id: &ChatId) -> bool {
        let before = self.chats.len();
        self.chats = std::mem::take(&mut self.chats)
            .into_iter()
            .filter(|c| &c.id != id)
            .collect();
        let removed = self.chats.len() != before;
        if removed {
            if self.current_chat_id.as_ref() == Some(id) {
                self.current_chat_id = None;
            }
            self.persist();
        }
        removed
    }

    /// Rename a chat in place.  Returns `true` if it was present.
    pub fn rename_chat(&mut self, id: &ChatId, name: &str) -> bool {
        self.update_chat(id, |chat| Chat {
            name: name.to_string(),
            ..chat
        })
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Replace the messages of a chat.  Returns `true` if it was present.
    pub fn set_messages(&mut self, id: &ChatId, messages: Vec<Message>) -> bool {
        self.update_chat(id, |chat| Chat {
            messages: Some(messages),
            ..chat
        })
    }

    /// Append a message to the end of a chat's sequence.
    pub fn append_message(&mut self, id: &ChatId, message: Message) -> bool {
        self.update_chat(id, |chat| {
            let mut messages = chat.messages.unwrap_or_default();
            messages.push(message);
            Chat {
                messages: Some(messages),
                ..chat
            }
        })
    }

    /// Remove a message from a chat.  Returns `true` if it was present.
    pub fn remove_message(&mut self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        let present = self
            .chat(chat_id)
            .and_then(|c| c.messages.as_ref())
            .is_some_and(|msgs| msgs.iter().any(|m| &m.id == message_id));
        if !present {
            return false;
        }

        self.update_chat(chat_id, |chat| Chat {
            messages: chat
                .messages
                .map(|msgs| msgs.into_iter().filter(|m| &m.id != message_id).collect()),
            ..chat
        })
    }

    /// Apply feedback to a message wherever it appears; the two flags are
    /// left mutually exclusive.  Returns `true` if any message matched.
    pub fn set_feedback(&mut self, message_id: &MessageId, feedback: Feedback) -> bool {
        let (likes, dislikes) = feedback.flags();
        let mut matched = false;

        self.chats = std::mem::take(&mut self.chats)
            .into_iter()
            .map(|chat| {
                let messages = match chat.messages {
                    Some(messages) => messages,
                    None => return chat,
                };
                let messages = messages
                    .into_iter()
                    .map(|m| {
                        if &m.id == message_id {
                            matched = true;
                            Message {
                                likes,
                                dislikes,
                                ..m
                            }
                        } else {
                            m
                        }
                    })
                    .collect();
                Chat {
                    messages: Some(messages),
                    ..chat
                }
            })
            .collect();

        if matched {
            self.persist();
        }
        matched
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Rebuild the chat list with the chat matching `id` replaced by
    /// `update(chat)`.
    fn update_chat(&mut self, id: &ChatId, update: impl FnOnce(Chat) -> Chat) -> bool {
        let mut update = Some(update);
        self.chats = std::mem::take(&mut self.chats)
            .into_iter()
            .map(|chat| match update.take() {
                Some(f) if &chat.id == id => f(chat),
                pending => {
                    update = pending;
                    chat
                }
            })
            .collect();

        let matched = update.is_none();
        if matched {
            self.persist();
        }
        matched
    }

    fn persist(&self) {
        if !self.hydrated {
            return;
        }
        let Some(db) = &self.storage else {
            return;
        };

        let snapshot = PersistedChats {
            chats: self.chats.clone(),
        };
        if let Err(e) = db.save_chats(&snapshot) {
            tracing::warn!(error = %e, "failed to persist chat state");
        }
    }
}

impl Default for ChatCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

//! The chat store: remote operations reconciled into the local cache.
//!
//! [`ChatStore`] is the only mutation surface over [`ChatCache`].  Each
//! operation flips the shared loading flag on, talks to the API, applies the
//! result to the cache and settles the flag again.  Failures are returned to
//! the caller and also recorded in the cache's last-error slot.
//!
//! The cache lock is never held across an `.await`, so each cache update is
//! atomic with respect to other tasks, but nothing spans several awaited
//! steps: a concurrent `fetch_messages` and `send_message` on the same chat
//! may interleave.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use askbar_shared::{Chat, ChatId, ClientId, Feedback, Message, MessageId};
use askbar_store::{ChatCache, Database};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::api::ChatApi;
use crate::attachments::{Attachment, Attachments};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{EventBus, StoreEvent};
use crate::sse::StreamEvent;

#[derive(Clone)]
pub struct ChatStore {
    api: ChatApi,
    client_id: ClientId,
    cache: Arc<Mutex<ChatCache>>,
    events: EventBus,
    fetch_debounce: Duration,
    /// Incremented by every `fetch_chats` call; only the latest call in a
    /// debounce window goes to the network.
    fetch_ticket: Arc<AtomicU64>,
    fetch_in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the fetch settles, however it settles.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatStore {
    /// Open the configured storage and build a store on top of it.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let db = match &config.data_dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        Self::with_database(config, db)
    }

    /// Build a store persisting to `db`; the client identifier is read from
    /// (or created in) the same storage.
    pub fn with_database(config: &ClientConfig, db: Database) -> Result<Self> {
        let client_id = db.client_id()?;
        Ok(Self::from_parts(
            config,
            client_id,
            ChatCache::new(Some(db)),
        ))
    }

    /// Build a store with no durable storage.
    pub fn in_memory(config: &ClientConfig, client_id: ClientId) -> Self {
        Self::from_parts(config, client_id, ChatCache::in_memory())
    }

    fn from_parts(config: &ClientConfig, client_id: ClientId, cache: ChatCache) -> Self {
        let api = ChatApi::new(config.api_url.clone());
        info!(api = %api.base_url(), client_id = %client_id, "chat store created");
        Self {
            api,
            client_id,
            cache: Arc::new(Mutex::new(cache)),
            events: EventBus::new(config.event_buffer),
            fetch_debounce: config.fetch_debounce,
            fetch_ticket: Arc::new(AtomicU64::new(0)),
            fetch_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, ChatCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn chats(&self) -> Vec<Chat> {
        self.cache().chats().to_vec()
    }

    pub fn chat(&self, id: &ChatId) -> Option<Chat> {
        self.cache().chat(id).cloned()
    }

    pub fn loading(&self) -> bool {
        self.cache().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.cache().error().map(str::to_string)
    }

    pub fn streaming_text(&self) -> String {
        self.cache().streaming_text().to_string()
    }

    pub fn is_hydrated(&self) -> bool {
        self.cache().is_hydrated()
    }

    pub fn current_chat_id(&self) -> Option<ChatId> {
        self.cache().current_chat_id().cloned()
    }

    // ------------------------------------------------------------------
    // Local operations
    // ------------------------------------------------------------------

    /// Restore persisted chats.  Server fetches are refused until this ran.
    pub fn hydrate(&self) {
        let newly = {
            let mut cache = self.cache();
            let was = cache.is_hydrated();
            cache.hydrate();
            !was
        };
        if newly {
            self.events.emit(StoreEvent::Hydrated);
        }
    }

    pub fn set_current_chat(&self, id: Option<ChatId>) {
        self.cache().set_current_chat(id);
    }

    // ------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------

    /// Replace the local chat list with the server's.
    ///
    /// Calls arriving within the debounce window collapse into the last one;
    /// a call made while a fetch is already in flight does nothing.
    pub async fn fetch_chats(&self) -> Result<()> {
        self.ensure_hydrated()?;

        let ticket = self.fetch_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.fetch_debounce).await;
        if self.fetch_ticket.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "chat fetch superseded");
            return Ok(());
        }
        if self.fetch_in_flight.swap(true, Ordering::SeqCst) {
            debug!("chat fetch already in flight");
            return Ok(());
        }
        let _guard = InFlight(self.fetch_in_flight.clone());

        self.cache().begin();
        match self.api.list_chats(&self.client_id).await {
            Ok(chats) => {
                debug!(count = chats.len(), "fetched chats");
                {
                    let mut cache = self.cache();
                    cache.replace_chats(chats);
                    cache.finish();
                }
                self.events.emit(StoreEvent::ChatsChanged);
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Create a chat and append it to the local list.
    pub async fn create_chat(&self, name: &str) -> Result<Chat> {
        self.cache().begin();
        match self.api.create_chat(name, &self.client_id).await {
            Ok(chat) => {
                info!(chat = %chat.id, "chat created");
                {
                    let mut cache = self.cache();
                    cache.push_chat(chat.clone());
                    cache.finish();
                }
                self.events.emit(StoreEvent::ChatsChanged);
                Ok(chat)
            }
            Err(e) => Err(self.record(e)),
        }
    }

    pub async fn delete_chat(&self, chat_id: &ChatId) -> Result<()> {
        self.cache().begin();
        match self.api.delete_chat(chat_id).await {
            Ok(()) => {
                info!(chat = %chat_id, "chat deleted");
                {
                    let mut cache = self.cache();
                    cache.remove_chat(chat_id);
                    cache.finish();
                }
                self.events.emit(StoreEvent::ChatsChanged);
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Load the messages of a chat, replacing whatever was cached.
    pub async fn fetch_messages(&self, chat_id: &ChatId) -> Result<()> {
        self.ensure_hydrated()?;

        self.cache().begin();
        match self.api.list_messages(chat_id).await {
            Ok(messages) => {
                debug!(chat = %chat_id, count = messages.len(), "fetched messages");
                {
                    let mut cache = self.cache();
                    if !cache.set_messages(chat_id, messages) {
                        warn!(chat = %chat_id, "messages fetched for a chat not in the list");
                    }
                    cache.finish();
                }
                self.events.emit(StoreEvent::MessagesChanged {
                    chat_id: chat_id.clone(),
                });
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Fetch messages only if they have never been loaded for this chat.
    pub async fn open_chat(&self, chat_id: &ChatId) -> Result<()> {
        let loaded = self
            .cache()
            .chat(chat_id)
            .ok_or_else(|| ClientError::UnknownChat(chat_id.clone()))?
            .messages
            .is_some();
        self.set_current_chat(Some(chat_id.clone()));
        if loaded {
            return Ok(());
        }
        self.fetch_messages(chat_id).await
    }

    /// Send a user message and stream the assistant's reply.
    ///
    /// The user message is inserted under a temporary id before any network
    /// call.  Streamed fragments accumulate in the streaming buffer; the final
    /// assistant message is appended when the `complete` event arrives.  On
    /// any failure the temporary message is removed again.
    pub async fn send_message(
        &self,
        chat_id: &ChatId,
        content: &str,
        attachments: Attachments,
    ) -> Result<Message> {
        let placeholder_id = MessageId::temporary();
        let placeholder = Message {
            image: attachments.image.as_ref().map(Attachment::reference),
            audio: attachments.audio.as_ref().map(Attachment::reference),
            ..Message::pending_user(
                placeholder_id.clone(),
                chat_id.clone(),
                attachments.display_content(content),
            )
        };

        {
            let mut cache = self.cache();
            cache.begin();
            cache.clear_stream();
            cache.append_message(chat_id, placeholder);
        }
        self.events.emit(StoreEvent::MessagesChanged {
            chat_id: chat_id.clone(),
        });

        match self.stream_reply(chat_id, content, attachments).await {
            Ok(message) => Ok(message),
            Err(e) => {
                {
                    let mut cache = self.cache();
                    cache.remove_message(chat_id, &placeholder_id);
                    cache.clear_stream();
                }
                warn!(chat = %chat_id, placeholder = %placeholder_id, "send failed, placeholder removed");
                self.events.emit(StoreEvent::MessagesChanged {
                    chat_id: chat_id.clone(),
                });
                Err(self.record(e))
            }
        }
    }

    async fn stream_reply(
        &self,
        chat_id: &ChatId,
        content: &str,
        attachments: Attachments,
    ) -> Result<Message> {
        let body = attachments.into_body(content).await?;
        let mut events = self.api.stream_message(chat_id, &body).await?;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Processing => debug!(chat = %chat_id, "assistant is processing"),
                StreamEvent::Delta(text) => {
                    self.cache().append_stream(&text);
                    self.events.emit(StoreEvent::StreamDelta {
                        chat_id: chat_id.clone(),
                        text,
                    });
                }
                StreamEvent::Complete(message) => {
                    self.finalize(chat_id, message.clone());
                    return Ok(message);
                }
            }
        }

        Err(ClientError::NoFinalMessage)
    }

    fn finalize(&self, chat_id: &ChatId, message: Message) {
        let message_id = message.id.clone();
        let new_name = message.chat_new_name.clone();
        {
            let mut cache = self.cache();
            cache.append_message(chat_id, message);
            if let Some(name) = new_name.as_deref() {
                cache.rename_chat(chat_id, name);
            }
            cache.clear_stream();
            cache.finish();
        }

        info!(chat = %chat_id, message = %message_id, "assistant reply received");
        self.events.emit(StoreEvent::StreamFinished {
            chat_id: chat_id.clone(),
            message_id,
        });
        self.events.emit(StoreEvent::MessagesChanged {
            chat_id: chat_id.clone(),
        });
        if new_name.is_some() {
            self.events.emit(StoreEvent::ChatsChanged);
        }
    }

    pub async fn like_message(&self, message_id: &MessageId) -> Result<()> {
        self.rate_message(message_id, Feedback::Like).await
    }

    pub async fn dislike_message(&self, message_id: &MessageId) -> Result<()> {
        self.rate_message(message_id, Feedback::Dislike).await
    }

    async fn rate_message(&self, message_id: &MessageId, feedback: Feedback) -> Result<()> {
        self.cache().begin();
        match self.api.rate_message(message_id, feedback).await {
            Ok(()) => {
                let chat_id = {
                    let mut cache = self.cache();
                    cache.set_feedback(message_id, feedback);
                    cache.finish();
                    cache.message(message_id).map(|m| m.chat_id.clone())
                };
                if let Some(chat_id) = chat_id {
                    self.events.emit(StoreEvent::MessagesChanged { chat_id });
                }
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    pub async fn rename_chat(&self, chat_id: &ChatId, name: &str) -> Result<()> {
        self.cache().begin();
        match self.api.rename_chat(chat_id, name).await {
            Ok(()) => {
                {
                    let mut cache = self.cache();
                    cache.rename_chat(chat_id, name);
                    cache.finish();
                }
                self.events.emit(StoreEvent::ChatsChanged);
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_hydrated(&self) -> Result<()> {
        if self.cache().is_hydrated() {
            Ok(())
        } else {
            Err(self.record(ClientError::NotHydrated))
        }
    }

    /// Record `err` as the last error, clear loading and hand it back.
    fn record(&self, err: ClientError) -> ClientError {
        let message = err.to_string();
        warn!(error = %message, "chat operation failed");
        self.cache().fail(message.clone());
        self.events.emit(StoreEvent::Failed { message });
        err
    }
}

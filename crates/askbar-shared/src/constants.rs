/// Storage key holding the persisted client identifier
pub const CLIENT_ID_KEY: &str = "user_id";

/// Storage key holding the persisted `{ "chats": [...] }` snapshot
pub const CHAT_STORAGE_KEY: &str = "chat-storage";

/// Prefix of locally generated placeholder message ids
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Text appended to the displayed content of a message carrying audio
pub const AUDIO_MARKER: &str = " [voice message]";

/// Text appended to the displayed content of a message carrying an image
pub const IMAGE_MARKER: &str = " [image]";

/// Window in which repeated chat-list fetches collapse into one request
pub const FETCH_DEBOUNCE_MS: u64 = 300;

/// Default base URL of the chat API
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default capacity of the store event bus
pub const DEFAULT_EVENT_BUFFER: usize = 256;

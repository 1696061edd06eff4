use askbar_shared::ChatId;
use askbar_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// 400 response; the server's `detail` is shown verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Any other non-success status.
    #[error("{0}")]
    Failed(&'static str),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Stream ended without a final message")]
    NoFinalMessage,

    #[error("Chat state has not been restored yet")]
    NotHydrated,

    #[error("Unknown chat: {0}")]
    UnknownChat(ChatId),

    #[error("Could not read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("Invalid server payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

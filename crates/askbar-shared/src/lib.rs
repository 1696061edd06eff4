// Shared data model, identity and constants for the Askbar chat client.

pub mod constants;
pub mod identity;
pub mod types;

pub use identity::ClientId;
pub use types::{Chat, ChatId, ErrorResponse, Feedback, Message, MessageId, Role, Source};

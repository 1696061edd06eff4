//! The persisted `{ "chats": [...] }` blob.

use askbar_shared::constants::CHAT_STORAGE_KEY;
use askbar_shared::Chat;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;

/// The persisted slice of the chat state.  Loading, error and streaming
/// fields are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedChats {
    pub chats: Vec<Chat>,
}

impl Database {
    /// Read the chat snapshot, `None` if nothing was ever written.
    pub fn load_chats(&self) -> Result<Option<PersistedChats>> {
        match self.get_item(CHAT_STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the chat snapshot.
    pub fn save_chats(&self, snapshot: &PersistedChats) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.set_item(CHAT_STORAGE_KEY, &json)
    }

    /// Drop the chat snapshot.  Returns `true` if one was stored.
    pub fn clear_chats(&self) -> Result<bool> {
        self.remove_item(CHAT_STORAGE_KEY)
    }
}

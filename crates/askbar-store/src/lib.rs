//! # askbar-store
//!
//! Client-side persistence and state for the Askbar chat client.
//!
//! A small SQLite key-value table stands in for browser local storage: it
//! holds the client identifier and a JSON snapshot of the chat list.  On top
//! of it, [`ChatCache`] is the single in-memory source of truth for chats
//! and messages, mirrored to storage after every change once hydrated.

pub mod cache;
pub mod database;
pub mod identity;
pub mod kv;
pub mod migrations;
pub mod snapshot;

mod error;

pub use cache::ChatCache;
pub use database::Database;
pub use error::StoreError;
pub use snapshot::PersistedChats;

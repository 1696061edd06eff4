//! # askbar-client
//!
//! Chat client core: talks to the chat API, streams assistant replies and
//! keeps the local chat cache in sync.  Presentation layers drive a
//! [`ChatStore`] and listen to its [`StoreEvent`]s.

pub mod api;
pub mod attachments;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod store;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::ChatApi;
pub use attachments::{Attachment, Attachments};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{EventBus, StoreEvent};
pub use sse::StreamEvent;
pub use store::ChatStore;

/// Install the global subscriber.  `RUST_LOG` overrides the default filter.
/// Logs go to stderr so command output stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("askbar_client=info,askbar_store=info,askbar_media=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

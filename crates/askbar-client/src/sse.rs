//! Decoding of the message-creation event stream.
//!
//! The server emits three named events:
//! - `processing`   informational, no payload of interest
//! - `bot_response` `{ "content": "<delta>" }`, appended to the live buffer
//! - `complete`     the finalized assistant [`Message`]

use std::pin::Pin;

use askbar_shared::Message;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::{ClientError, Result};

pub const EVENT_PROCESSING: &str = "processing";
pub const EVENT_BOT_RESPONSE: &str = "bot_response";
pub const EVENT_COMPLETE: &str = "complete";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Processing,
    Delta(String),
    Complete(Message),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    content: String,
}

/// Decode one server-sent event.  Unknown event names yield `None`.
pub fn decode_event(event: &str, data: &str) -> Result<Option<StreamEvent>> {
    match event {
        EVENT_PROCESSING => Ok(Some(StreamEvent::Processing)),
        EVENT_BOT_RESPONSE => {
            let payload: DeltaPayload = serde_json::from_str(data)?;
            Ok(Some(StreamEvent::Delta(payload.content)))
        }
        EVENT_COMPLETE => Ok(Some(StreamEvent::Complete(serde_json::from_str(data)?))),
        other => {
            tracing::trace!(event = other, "ignoring unknown stream event");
            Ok(None)
        }
    }
}

/// Turn a raw response body into a stream of decoded events, in the order
/// the server emitted them.
pub fn event_stream<S, E>(body: S) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(body.eventsource().filter_map(|item| async move {
        match item {
            Ok(event) => decode_event(&event.event, &event.data).transpose(),
            Err(e) => Some(Err(ClientError::Stream(e.to_string()))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use askbar_shared::Role;
    use futures::stream;

    fn body(raw: &'static str) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        // split mid-event to exercise buffering across chunks
        let (a, b) = raw.split_at(raw.len() / 2);
        stream::iter(vec![Ok(Bytes::from(a)), Ok(Bytes::from(b))])
    }

    #[test]
    fn test_decode_known_events() {
        assert_eq!(
            decode_event("processing", "{}").unwrap(),
            Some(StreamEvent::Processing)
        );
        assert_eq!(
            decode_event("bot_response", r#"{"content":"Hi"}"#).unwrap(),
            Some(StreamEvent::Delta("Hi".into()))
        );

        let complete = decode_event(
            "complete",
            r#"{"id":"m1","chat_id":"c1","content":"Hi there","role":"Assistant","timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        match complete {
            Some(StreamEvent::Complete(msg)) => {
                assert_eq!(msg.role, Role::Assistant);
                assert_eq!(msg.content, "Hi there");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        assert_eq!(decode_event("message", "hello").unwrap(), None);
    }

    #[test]
    fn test_malformed_complete_is_an_error() {
        assert!(decode_event("complete", "{\"id\":").is_err());
    }

    #[tokio::test]
    async fn test_event_stream_preserves_order() {
        let raw = "event: processing\ndata: {}\n\n\
                   event: bot_response\ndata: {\"content\":\"Hi\"}\n\n\
                   event: ping\ndata: x\n\n\
                   event: bot_response\ndata: {\"content\":\" there\"}\n\n";
        let events: Vec<_> = event_stream(body(raw))
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Processing,
                StreamEvent::Delta("Hi".into()),
                StreamEvent::Delta(" there".into()),
            ]
        );
    }
}

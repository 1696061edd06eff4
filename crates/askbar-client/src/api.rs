//! HTTP client for the chat API.
//!
//! Thin request/response layer: no local state is touched here.  Status
//! handling follows one contract for every endpoint: a 400 carries a
//! structured [`ErrorResponse`] whose `detail` becomes the failure reason,
//! any other non-success status becomes a fixed per-operation message.

use askbar_shared::{Chat, ChatId, ClientId, ErrorResponse, Feedback, Message, MessageId};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attachments::SendMessageBody;
use crate::error::{ClientError, Result};
use crate::sse::{event_stream, EventStream};

const FETCH_CHATS_FAILED: &str = "Failed to fetch chats";
const CREATE_CHAT_FAILED: &str = "Failed to create chat";
const DELETE_CHAT_FAILED: &str = "Failed to delete chat";
const FETCH_MESSAGES_FAILED: &str = "Failed to fetch messages";
const SEND_MESSAGE_FAILED: &str = "Failed to send message";
const LIKE_FAILED: &str = "Failed to like message";
const DISLIKE_FAILED: &str = "Failed to dislike message";
const RENAME_FAILED: &str = "Failed to rename chat";

#[derive(Serialize)]
struct CreateChatRequest<'a> {
    name: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct CreateChatResponse {
    chat: Chat,
}

#[derive(Serialize)]
struct RenameChatRequest<'a> {
    name: &'a str,
}

#[derive(Clone, Debug)]
pub struct ChatApi {
    base_url: String,
    http: Client,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /chats?user_id=…`
    pub async fn list_chats(&self, client_id: &ClientId) -> Result<Vec<Chat>> {
        let resp = self
            .http
            .get(self.url("/chats"))
            .query(&[("user_id", client_id.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Failed(FETCH_CHATS_FAILED));
        }
        Ok(resp.json().await?)
    }

    /// `POST /chats`
    pub async fn create_chat(&self, name: &str, client_id: &ClientId) -> Result<Chat> {
        let resp = self
            .http
            .post(self.url("/chats"))
            .json(&CreateChatRequest {
                name,
                user_id: client_id.as_str(),
            })
            .send()
            .await?;
        let resp = check(resp, CREATE_CHAT_FAILED).await?;
        let body: CreateChatResponse = resp.json().await?;
        Ok(body.chat)
    }

    /// `DELETE /chats/{id}`
    pub async fn delete_chat(&self, chat_id: &ChatId) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/chats/{chat_id}")))
            .send()
            .await?;
        check(resp, DELETE_CHAT_FAILED).await?;
        Ok(())
    }

    /// `GET /chats/{id}/messages`
    pub async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>> {
        let resp = self
            .http
            .get(self.url(&format!("/chats/{chat_id}/messages")))
            .send()
            .await?;
        let resp = check(resp, FETCH_MESSAGES_FAILED).await?;
        Ok(resp.json().await?)
    }

    /// `POST /chats/{id}/messages`, answered with an event stream.
    pub async fn stream_message(
        &self,
        chat_id: &ChatId,
        body: &SendMessageBody,
    ) -> Result<EventStream> {
        let resp = self
            .http
            .post(self.url(&format!("/chats/{chat_id}/messages")))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await?;
        let resp = check(resp, SEND_MESSAGE_FAILED).await?;
        debug!(chat = %chat_id, "message stream opened");
        Ok(event_stream(resp.bytes_stream()))
    }

    /// `PUT /messages/{id}/like` or `/dislike`
    pub async fn rate_message(&self, message_id: &MessageId, feedback: Feedback) -> Result<()> {
        let failure = match feedback {
            Feedback::Like => LIKE_FAILED,
            Feedback::Dislike => DISLIKE_FAILED,
        };
        let resp = self
            .http
            .put(self.url(&format!("/messages/{message_id}/{}", feedback.as_path())))
            .send()
            .await?;
        check(resp, failure).await?;
        Ok(())
    }

    /// `PUT /chats/{id}/rename`
    pub async fn rename_chat(&self, chat_id: &ChatId, name: &str) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&format!("/chats/{chat_id}/rename")))
            .json(&RenameChatRequest { name })
            .send()
            .await?;
        check(resp, RENAME_FAILED).await?;
        Ok(())
    }
}

/// Map a response to the error contract shared by all endpoints.
async fn check(resp: Response, failure: &'static str) -> Result<Response> {
    let status = resp.status();
    if status == StatusCode::BAD_REQUEST {
        return match resp.json::<ErrorResponse>().await {
            Ok(err) => Err(ClientError::Rejected(err.detail)),
            Err(_) => Err(ClientError::Failed(failure)),
        };
    }
    if !status.is_success() {
        debug!(%status, failure, "request failed");
        return Err(ClientError::Failed(failure));
    }
    Ok(resp)
}

//! Image and audio payloads attached to an outgoing message.

use std::path::PathBuf;

use askbar_media::AudioClip;
use askbar_shared::constants::{AUDIO_MARKER, IMAGE_MARKER};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

/// Raw payload of an attachment.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Bytes already in memory, e.g. an encoded recording.
    Bytes(Bytes),
    /// A file read when the message is sent.
    File(PathBuf),
}

impl Attachment {
    /// Read (if needed) and base64-encode the payload.
    pub async fn to_base64(&self) -> Result<String> {
        match self {
            Attachment::Bytes(bytes) => Ok(STANDARD.encode(bytes)),
            Attachment::File(path) => {
                let data = tokio::fs::read(path).await?;
                Ok(STANDARD.encode(data))
            }
        }
    }

    /// Local reference kept on the optimistic message: the file path, or the
    /// payload size for in-memory data.
    pub fn reference(&self) -> String {
        match self {
            Attachment::Bytes(bytes) => format!("inline:{} bytes", bytes.len()),
            Attachment::File(path) => path.display().to_string(),
        }
    }
}

impl From<&AudioClip> for Attachment {
    fn from(clip: &AudioClip) -> Self {
        Attachment::Bytes(clip.to_wav())
    }
}

impl From<PathBuf> for Attachment {
    fn from(path: PathBuf) -> Self {
        Attachment::File(path)
    }
}

/// Optional media sent along with the text of a message.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    pub image: Option<Attachment>,
    pub audio: Option<Attachment>,
}

impl Attachments {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: impl Into<Attachment>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_audio(mut self, audio: impl Into<Attachment>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    /// Text shown for the optimistic user message.  Audio takes precedence
    /// over an image when both are attached.
    pub fn display_content(&self, content: &str) -> String {
        if self.audio.is_some() {
            format!("{content}{AUDIO_MARKER}")
        } else if self.image.is_some() {
            format!("{content}{IMAGE_MARKER}")
        } else {
            content.to_string()
        }
    }

    /// Encode every attachment and build the request body.
    pub async fn into_body(self, content: &str) -> Result<SendMessageBody> {
        let image_base64 = match &self.image {
            Some(image) => Some(image.to_base64().await?),
            None => None,
        };
        let audio_base64 = match &self.audio {
            Some(audio) => Some(audio.to_base64().await?),
            None => None,
        };

        Ok(SendMessageBody {
            content: content.to_string(),
            image_base64,
            audio_base64,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendMessageBody {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

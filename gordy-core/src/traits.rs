// ABOUTME: Transport boundary types: inbound room events and the outbound gateway trait
// ABOUTME: Anything that can deliver RoomEvents and implement MessageGateway can host the bot

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Inbound Events
// =============================================================================

/// An event delivered by the transport, already reduced to the shapes the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A plain text message posted in a room
    TextMessage(TextMessage),
    /// A membership invite; `target_user` is the invitee (the event's state key)
    InviteReceived {
        room_id: String,
        target_user: String,
        inviter: String,
    },
    /// To-device key verification request
    KeyVerificationRequest {
        sender: String,
        transaction_id: String,
    },
    /// An encrypted event the transport could not decrypt
    DecryptionFailure { room_id: String, sender: String },
    /// Anything else the transport surfaced
    Unknown {
        room_id: Option<String>,
        event_type: String,
    },
}

impl RoomEvent {
    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RoomEvent::TextMessage(_) => "text_message",
            RoomEvent::InviteReceived { .. } => "invite",
            RoomEvent::KeyVerificationRequest { .. } => "key_verification",
            RoomEvent::DecryptionFailure { .. } => "decryption_failure",
            RoomEvent::Unknown { .. } => "unknown",
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        match self {
            RoomEvent::TextMessage(msg) => Some(&msg.room_id),
            RoomEvent::InviteReceived { room_id, .. } => Some(room_id),
            RoomEvent::KeyVerificationRequest { .. } => None,
            RoomEvent::DecryptionFailure { room_id, .. } => Some(room_id),
            RoomEvent::Unknown { room_id, .. } => room_id.as_deref(),
        }
    }
}

/// A text message posted in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub room_id: String,
    pub sender: String,
    pub body: String,
}

impl TextMessage {
    pub fn new(
        room_id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender: sender.into(),
            body: body.into(),
        }
    }
}

// =============================================================================
// Outbound Types
// =============================================================================

/// Opaque reference returned by a media upload (an `mxc://` URI on Matrix)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef(pub String);

impl ContentRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata attached to an image message envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Descriptive title shown as the message body
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
}

/// An in-memory image ready to upload
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ImagePayload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            size: self.size(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Failures surfaced by a transport's outbound primitives
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("send to {room_id} failed after retries: {reason}")]
    RetryExhausted { room_id: String, reason: String },

    #[error("media upload failed: {0}")]
    Upload(String),

    #[error("failed to join {room_id}: {reason}")]
    Join { room_id: String, reason: String },

    #[error("unknown room {0}")]
    UnknownRoom(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Gateway Trait
// =============================================================================

/// Raw outbound capabilities of a chat transport.
///
/// Implementations report failures as `GatewayError`; the bot never calls these
/// directly but goes through [`crate::outbound::Outbound`], which logs and absorbs them.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// The agent's own user id on this transport
    fn own_user_id(&self) -> &str;

    /// Send a text message with a plain body and an HTML formatted body
    async fn send_text(&self, room_id: &str, plain: &str, html: &str) -> GatewayResult<()>;

    /// Set or clear the typing indicator
    async fn set_typing(&self, room_id: &str, active: bool, timeout: Duration)
        -> GatewayResult<()>;

    /// Upload raw media bytes, returning a content reference
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> GatewayResult<ContentRef>;

    /// Send an image message referencing previously uploaded content
    async fn send_image(
        &self,
        room_id: &str,
        content: &ContentRef,
        info: &ImageInfo,
    ) -> GatewayResult<()>;

    /// Join a room the agent has been invited to
    async fn join_room(&self, room_id: &str) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_labels() {
        let msg = RoomEvent::TextMessage(TextMessage::new("!r:x", "@a:x", "hi"));
        assert_eq!(msg.kind(), "text_message");
        assert_eq!(msg.room_id(), Some("!r:x"));

        let verification = RoomEvent::KeyVerificationRequest {
            sender: "@a:x".into(),
            transaction_id: "txn".into(),
        };
        assert_eq!(verification.kind(), "key_verification");
        assert_eq!(verification.room_id(), None);
    }

    #[test]
    fn test_image_payload_size_matches_bytes() {
        let payload = ImagePayload {
            bytes: vec![0; 42],
            content_type: "image/gif".into(),
            filename: "dice.gif".into(),
            width: 10,
            height: 20,
        };
        let info = payload.info();
        assert_eq!(info.size, 42);
        assert_eq!(info.width, 10);
        assert_eq!(info.height, 20);
        assert_eq!(info.filename, "dice.gif");
    }

    #[test]
    fn test_gateway_error_messages() {
        let err = GatewayError::RetryExhausted {
            room_id: "!r:x".into(),
            reason: "timed out".into(),
        };
        assert_eq!(err.to_string(), "send to !r:x failed after retries: timed out");

        let err = GatewayError::Join {
            room_id: "!r:x".into(),
            reason: "forbidden".into(),
        };
        assert!(err.to_string().contains("forbidden"));
    }
}

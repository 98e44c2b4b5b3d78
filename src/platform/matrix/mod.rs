// ABOUTME: Matrix transport for gordy: MessageGateway over matrix-sdk plus event translation
// ABOUTME: SDK events are reduced to RoomEvents and handed to the EventAdapter

use anyhow::Context;
use async_trait::async_trait;
use gordy_core::{
    ContentRef, EventAdapter, GatewayError, GatewayResult, ImageInfo, MessageGateway, RoomEvent,
    TextMessage,
};
use matrix_sdk::{
    room::Room,
    ruma::{
        events::{
            key::verification::request::ToDeviceKeyVerificationRequestEvent,
            room::{
                encrypted::OriginalSyncRoomEncryptedEvent,
                member::{MembershipState, StrippedRoomMemberEvent},
                message::{
                    ImageMessageEventContent, MessageType, RoomMessageEventContent,
                    SyncRoomMessageEvent,
                },
                ImageInfo as MatrixImageInfo,
            },
            AnySyncTimelineEvent, TimelineEventType,
        },
        OwnedMxcUri, OwnedRoomId, UInt,
    },
    Client,
};
use std::fmt;
use std::time::Duration;

// =============================================================================
// MatrixGateway - Implements MessageGateway
// =============================================================================

/// Outbound primitives backed by a logged-in matrix-sdk client
#[derive(Clone)]
pub struct MatrixGateway {
    client: Client,
    /// Cached at construction so `own_user_id` can hand out a borrow
    user_id: String,
}

impl MatrixGateway {
    /// Wrap a logged-in client. Fails if the client has no session yet.
    pub fn new(client: Client) -> anyhow::Result<Self> {
        let user_id = client
            .user_id()
            .context("MatrixGateway requires a logged-in client")?
            .to_string();
        Ok(Self { client, user_id })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn room(&self, room_id: &str) -> GatewayResult<Room> {
        let parsed: OwnedRoomId = room_id
            .parse()
            .map_err(|_| GatewayError::UnknownRoom(room_id.to_string()))?;
        self.client
            .get_room(&parsed)
            .ok_or_else(|| GatewayError::UnknownRoom(room_id.to_string()))
    }
}

impl fmt::Debug for MatrixGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixGateway")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// HTTP failures surface after the SDK's own retries; anything else is a transport bug
fn send_error(room_id: &str, e: matrix_sdk::Error) -> GatewayError {
    match e {
        matrix_sdk::Error::Http(_) => GatewayError::RetryExhausted {
            room_id: room_id.to_string(),
            reason: e.to_string(),
        },
        other => GatewayError::Transport(anyhow::Error::new(other)),
    }
}

/// Build the `m.image` envelope for previously uploaded content
fn image_content(content: &ContentRef, info: &ImageInfo) -> RoomMessageEventContent {
    let mut matrix_info = MatrixImageInfo::new();
    matrix_info.mimetype = Some(info.content_type.clone());
    matrix_info.size = UInt::new(info.size);
    matrix_info.width = Some(UInt::from(info.width));
    matrix_info.height = Some(UInt::from(info.height));

    let mut image = ImageMessageEventContent::plain(
        info.filename.clone(),
        OwnedMxcUri::from(content.as_str()),
    );
    image.info = Some(Box::new(matrix_info));

    RoomMessageEventContent::new(MessageType::Image(image))
}

#[async_trait]
impl MessageGateway for MatrixGateway {
    fn own_user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_text(&self, room_id: &str, plain: &str, html: &str) -> GatewayResult<()> {
        let room = self.room(room_id)?;
        room.send(RoomMessageEventContent::text_html(plain, html))
            .await
            .map_err(|e| send_error(room_id, e))?;
        Ok(())
    }

    async fn set_typing(
        &self,
        room_id: &str,
        active: bool,
        timeout: Duration,
    ) -> GatewayResult<()> {
        let room = self.room(room_id)?;
        // The SDK picks its own notice timeout and refreshes it while typing
        tracing::trace!(room_id, active, timeout_ms = timeout.as_millis() as u64, "typing");
        room.typing_notice(active)
            .await
            .map_err(|e| send_error(room_id, e))
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> GatewayResult<ContentRef> {
        let mime: mime_guess::mime::Mime = content_type.parse().unwrap_or_else(|_| {
            mime_guess::from_path(filename).first_or_octet_stream()
        });

        let response = self
            .client
            .media()
            .upload(&mime, bytes, None)
            .await
            .map_err(|e| GatewayError::Upload(e.to_string()))?;

        Ok(ContentRef(response.content_uri.to_string()))
    }

    async fn send_image(
        &self,
        room_id: &str,
        content: &ContentRef,
        info: &ImageInfo,
    ) -> GatewayResult<()> {
        let room = self.room(room_id)?;
        room.send(image_content(content, info))
            .await
            .map_err(|e| send_error(room_id, e))?;
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> GatewayResult<()> {
        let parsed: OwnedRoomId = room_id.parse().map_err(|e| GatewayError::Join {
            room_id: room_id.to_string(),
            reason: format!("invalid room id: {}", e),
        })?;
        self.client
            .join_room_by_id(&parsed)
            .await
            .map_err(|e| GatewayError::Join {
                room_id: room_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

// =============================================================================
// Event Translation
// =============================================================================

/// Reduce an SDK room message to the text-message shape, if it is one
fn text_message(event: &SyncRoomMessageEvent, room: &Room) -> Option<TextMessage> {
    let original = event.as_original()?;
    let MessageType::Text(text) = &original.content.msgtype else {
        return None;
    };
    Some(TextMessage::new(
        room.room_id().as_str(),
        original.sender.as_str(),
        text.body.clone(),
    ))
}

/// Event types that have a dedicated handler below
fn has_dedicated_handler(event_type: &TimelineEventType) -> bool {
    matches!(
        event_type,
        TimelineEventType::RoomMessage
            | TimelineEventType::RoomEncrypted
            | TimelineEventType::RoomMember
    )
}

/// Route every SDK event the bot cares about into the adapter.
///
/// Each handler awaits the adapter; commands are spawned by the dispatcher, so
/// a handler returns as soon as the event is classified.
pub fn register_event_handlers(client: &Client, adapter: EventAdapter) {
    let on_message = adapter.clone();
    client.add_event_handler(move |event: SyncRoomMessageEvent, room: Room| {
        let adapter = on_message.clone();
        async move {
            if let Some(message) = text_message(&event, &room) {
                adapter.handle(RoomEvent::TextMessage(message)).await;
            }
        }
    });

    let on_invite = adapter.clone();
    client.add_event_handler(move |event: StrippedRoomMemberEvent, room: Room| {
        let adapter = on_invite.clone();
        async move {
            if event.content.membership != MembershipState::Invite {
                return;
            }
            adapter
                .handle(RoomEvent::InviteReceived {
                    room_id: room.room_id().to_string(),
                    target_user: event.state_key.to_string(),
                    inviter: event.sender.to_string(),
                })
                .await;
        }
    });

    let on_to_device = adapter.clone();
    client.add_event_handler(move |event: ToDeviceKeyVerificationRequestEvent| {
        let adapter = on_to_device.clone();
        async move {
            adapter
                .handle(RoomEvent::KeyVerificationRequest {
                    sender: event.sender.to_string(),
                    transaction_id: event.content.transaction_id.to_string(),
                })
                .await;
        }
    });

    // Decrypted events arrive as their inner type; only failures stay encrypted
    let on_undecryptable = adapter.clone();
    client.add_event_handler(move |event: OriginalSyncRoomEncryptedEvent, room: Room| {
        let adapter = on_undecryptable.clone();
        async move {
            adapter
                .handle(RoomEvent::DecryptionFailure {
                    room_id: room.room_id().to_string(),
                    sender: event.sender.to_string(),
                })
                .await;
        }
    });

    let on_unknown = adapter;
    client.add_event_handler(move |event: AnySyncTimelineEvent, room: Room| {
        let adapter = on_unknown.clone();
        async move {
            let event_type = event.event_type();
            if has_dedicated_handler(&event_type) {
                return;
            }
            adapter
                .handle(RoomEvent::Unknown {
                    room_id: Some(room.room_id().to_string()),
                    event_type: event_type.to_string(),
                })
                .await;
        }
    });

    tracing::info!("Matrix event handlers registered");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_gateway_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatrixGateway>();
    }

    #[test]
    fn test_image_content_carries_dimensions() {
        let info = ImageInfo {
            filename: "dice.gif".into(),
            content_type: "image/gif".into(),
            size: 1234,
            width: 96,
            height: 64,
        };
        let content = image_content(&ContentRef("mxc://example.org/abc".into()), &info);

        let MessageType::Image(image) = content.msgtype else {
            panic!("expected an image message");
        };
        assert_eq!(image.body, "dice.gif");
        let meta = image.info.expect("image info");
        assert_eq!(meta.mimetype.as_deref(), Some("image/gif"));
        assert_eq!(meta.size, UInt::new(1234));
        assert_eq!(meta.width, Some(UInt::from(96u32)));
        assert_eq!(meta.height, Some(UInt::from(64u32)));
    }

    #[test]
    fn test_dedicated_handler_types() {
        assert!(has_dedicated_handler(&TimelineEventType::RoomMessage));
        assert!(has_dedicated_handler(&TimelineEventType::RoomMember));
        assert!(!has_dedicated_handler(&TimelineEventType::RoomTopic));
        assert!(!has_dedicated_handler(&TimelineEventType::Reaction));
    }
}

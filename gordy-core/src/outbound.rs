// ABOUTME: Outbound message gateway wrapping a transport's send primitives
// ABOUTME: Every operation logs and absorbs its own failure so multi-step replies keep going

use crate::{
    metrics,
    traits::{GatewayResult, ImagePayload, MessageGateway},
    utils::html_to_plain,
};
use std::sync::Arc;
use std::time::Duration;

/// How long a typing hint stays up unless cleared
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Cloneable handle used by the dispatcher and by commands to produce visible effects.
///
/// Send methods return `true` when the transport accepted the operation. A `false`
/// has already been logged; callers are free to ignore it.
#[derive(Clone)]
pub struct Outbound {
    gateway: Arc<dyn MessageGateway>,
}

impl Outbound {
    pub fn new(gateway: Arc<dyn MessageGateway>) -> Self {
        Self { gateway }
    }

    pub fn own_user_id(&self) -> &str {
        self.gateway.own_user_id()
    }

    /// Send an HTML formatted message; the plain body is derived by stripping tags
    pub async fn send_text(&self, room_id: &str, body: &str) -> bool {
        let plain = html_to_plain(body);
        self.send_html(room_id, &plain, body).await
    }

    /// Send a message with an explicit plain fallback
    pub async fn send_html(&self, room_id: &str, plain: &str, html: &str) -> bool {
        match self.gateway.send_text(room_id, plain, html).await {
            Ok(()) => true,
            Err(e) => {
                metrics::record_send_failure("send_text");
                tracing::error!(error = %e, room_id, "Unable to send message to room");
                false
            }
        }
    }

    /// Best-effort typing hint
    pub async fn send_typing(&self, room_id: &str, active: bool, timeout: Duration) -> bool {
        match self.gateway.set_typing(room_id, active, timeout).await {
            Ok(()) => true,
            Err(e) => {
                metrics::record_send_failure("send_typing");
                tracing::warn!(error = %e, room_id, active, "Failed to set typing indicator");
                false
            }
        }
    }

    /// Typing hint with the default timeout
    pub async fn typing(&self, room_id: &str) -> bool {
        self.send_typing(room_id, true, DEFAULT_TYPING_TIMEOUT).await
    }

    /// Upload an image and send a message referencing it.
    ///
    /// When the upload fails nothing is sent, so rooms never see a broken reference.
    pub async fn send_image(&self, room_id: &str, image: ImagePayload) -> bool {
        let info = image.info();
        let content = match self
            .gateway
            .upload(image.bytes, &info.content_type, &info.filename)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                metrics::record_send_failure("upload");
                tracing::error!(
                    error = %e,
                    room_id,
                    filename = %info.filename,
                    "Failed to upload image, skipping send"
                );
                return false;
            }
        };

        tracing::debug!(room_id, content = %content, size = info.size, "Image uploaded");

        match self.gateway.send_image(room_id, &content, &info).await {
            Ok(()) => {
                tracing::debug!(room_id, filename = %info.filename, "Image sent");
                true
            }
            Err(e) => {
                metrics::record_send_failure("send_image");
                tracing::error!(
                    error = %e,
                    room_id,
                    filename = %info.filename,
                    "Image send failed"
                );
                false
            }
        }
    }

    /// Join a room. Unlike the send helpers this hands the error back; the
    /// event adapter decides how to report it.
    pub async fn join_room(&self, room_id: &str) -> GatewayResult<()> {
        self.gateway.join_room(room_id).await
    }
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound")
            .field("own_user_id", &self.gateway.own_user_id())
            .finish()
    }
}

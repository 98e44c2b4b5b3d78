// ABOUTME: Event adapter translating transport events into dispatcher calls
// ABOUTME: Forwards text messages, auto-joins rooms on self-targeted invites, logs the rest

use crate::{
    bot::{Bot, Dispatch},
    metrics,
    traits::RoomEvent,
};
use std::sync::Arc;

/// What the adapter did with one event
#[derive(Debug)]
pub enum Handled {
    /// Text message handed to the dispatcher
    Dispatched(Dispatch),
    /// Invite for us, room joined
    Joined { room_id: String },
    /// Invite for us, join failed (logged)
    JoinFailed { room_id: String },
    /// Invite for someone else
    InviteIgnored,
    /// Logged only
    Logged,
}

/// Entry point for every inbound event. Never fails: per-event problems are logged here.
#[derive(Debug, Clone)]
pub struct EventAdapter {
    bot: Arc<Bot>,
}

impl EventAdapter {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    pub async fn handle(&self, event: RoomEvent) -> Handled {
        metrics::record_event(event.kind());

        match event {
            RoomEvent::TextMessage(message) => {
                tracing::debug!(
                    room_id = %message.room_id,
                    sender = %message.sender,
                    "on_message"
                );
                Handled::Dispatched(self.bot.process_message(message).await)
            }
            RoomEvent::InviteReceived {
                room_id,
                target_user,
                inviter,
            } => self.on_invite(room_id, target_user, inviter).await,
            RoomEvent::KeyVerificationRequest {
                sender,
                transaction_id,
            } => {
                tracing::debug!(%sender, %transaction_id, "on_to_device: key verification request");
                Handled::Logged
            }
            RoomEvent::DecryptionFailure { room_id, sender } => {
                tracing::debug!(%room_id, %sender, "on_decryption_failure");
                Handled::Logged
            }
            RoomEvent::Unknown {
                room_id,
                event_type,
            } => {
                tracing::debug!(room_id = ?room_id, %event_type, "on_unknown");
                Handled::Logged
            }
        }
    }

    async fn on_invite(&self, room_id: String, target_user: String, inviter: String) -> Handled {
        if target_user != self.bot.outbound().own_user_id() {
            tracing::debug!(%room_id, %target_user, "Ignoring invite for another user");
            return Handled::InviteIgnored;
        }

        tracing::debug!(%room_id, %inviter, "on_invite");

        match self.bot.outbound().join_room(&room_id).await {
            Ok(()) => {
                tracing::info!(%room_id, %inviter, "Joined room");
                Handled::Joined { room_id }
            }
            Err(e) => {
                metrics::record_send_failure("join");
                tracing::error!(error = %e, %room_id, "Error joining room");
                Handled::JoinFailed { room_id }
            }
        }
    }
}

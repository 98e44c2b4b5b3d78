// ABOUTME: Test doubles: a gateway that records outbound calls and scripted commands
// ABOUTME: Used by unit tests here and by integration tests in both crates

use crate::commands::{BotCommand, CommandContext};
use crate::traits::{ContentRef, GatewayError, GatewayResult, ImageInfo, MessageGateway};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One outbound call captured by [`RecordingGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text {
        room_id: String,
        plain: String,
        html: String,
    },
    Typing {
        room_id: String,
        active: bool,
        timeout: Duration,
    },
    Upload {
        content_type: String,
        filename: String,
        size: usize,
    },
    Image {
        room_id: String,
        content: ContentRef,
        info: ImageInfo,
    },
    Join {
        room_id: String,
    },
}

/// In-memory gateway that records successful calls and can be told to fail
#[derive(Debug)]
pub struct RecordingGateway {
    user_id: String,
    outgoing: Mutex<Vec<Outgoing>>,
    uploads: AtomicUsize,
    fail_sends: AtomicBool,
    fail_uploads: AtomicBool,
    fail_joins: AtomicBool,
    sent: Notify,
}

impl RecordingGateway {
    pub fn new(user_id: &str) -> Arc<Self> {
        Arc::new(Self {
            user_id: user_id.to_string(),
            outgoing: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            fail_joins: AtomicBool::new(false),
            sent: Notify::new(),
        })
    }

    /// Make text and image sends fail with `RetryExhausted`
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_joins(&self, fail: bool) {
        self.fail_joins.store(fail, Ordering::SeqCst);
    }

    /// Everything recorded so far, in order
    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.outgoing.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// HTML bodies of text messages sent to `room_id`
    pub fn texts_in(&self, room_id: &str) -> Vec<String> {
        self.outgoing()
            .into_iter()
            .filter_map(|o| match o {
                Outgoing::Text { room_id: r, html, .. } if r == room_id => Some(html),
                _ => None,
            })
            .collect()
    }

    /// Number of text messages sent anywhere
    pub fn text_count(&self) -> usize {
        self.outgoing()
            .iter()
            .filter(|o| matches!(o, Outgoing::Text { .. }))
            .count()
    }

    pub fn joins(&self) -> Vec<String> {
        self.outgoing()
            .into_iter()
            .filter_map(|o| match o {
                Outgoing::Join { room_id } => Some(room_id),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` text messages have been recorded
    pub async fn wait_for_texts(&self, count: usize) {
        loop {
            let notified = self.sent.notified();
            if self.text_count() >= count {
                return;
            }
            notified.await;
        }
    }

    fn record(&self, outgoing: Outgoing) {
        self.outgoing.lock().unwrap_or_else(|e| e.into_inner()).push(outgoing);
        self.sent.notify_waiters();
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    fn own_user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_text(&self, room_id: &str, plain: &str, html: &str) -> GatewayResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::RetryExhausted {
                room_id: room_id.to_string(),
                reason: "send rejected".into(),
            });
        }
        self.record(Outgoing::Text {
            room_id: room_id.to_string(),
            plain: plain.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    async fn set_typing(
        &self,
        room_id: &str,
        active: bool,
        timeout: Duration,
    ) -> GatewayResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport(anyhow::anyhow!("typing rejected")));
        }
        self.record(Outgoing::Typing {
            room_id: room_id.to_string(),
            active,
            timeout,
        });
        Ok(())
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> GatewayResult<ContentRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(GatewayError::Upload("media repository unavailable".into()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Outgoing::Upload {
            content_type: content_type.to_string(),
            filename: filename.to_string(),
            size: bytes.len(),
        });
        Ok(ContentRef(format!("mxc://test/{}", n)))
    }

    async fn send_image(
        &self,
        room_id: &str,
        content: &ContentRef,
        info: &ImageInfo,
    ) -> GatewayResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::RetryExhausted {
                room_id: room_id.to_string(),
                reason: "send rejected".into(),
            });
        }
        self.record(Outgoing::Image {
            room_id: room_id.to_string(),
            content: content.clone(),
            info: info.clone(),
        });
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> GatewayResult<()> {
        if self.fail_joins.load(Ordering::SeqCst) {
            return Err(GatewayError::Join {
                room_id: room_id.to_string(),
                reason: "forbidden".into(),
            });
        }
        self.record(Outgoing::Join {
            room_id: room_id.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Scripted Commands
// =============================================================================

/// Replies with its arguments and counts invocations in its state slot
#[derive(Debug, Default)]
pub struct EchoCommand;

#[async_trait]
impl BotCommand for EchoCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        {
            let mut state = ctx.state.lock().await;
            let count = state
                .get("invocations")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            state["invocations"] = Value::from(count + 1);
        }
        ctx.reply(&ctx.invocation.query()).await;
        Ok(())
    }
}

/// Sends one message, then fails
#[derive(Debug, Default)]
pub struct FailingCommand;

#[async_trait]
impl BotCommand for FailingCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        ctx.reply("about to fail").await;
        anyhow::bail!("deliberate failure")
    }
}

/// Never completes
#[derive(Debug, Default)]
pub struct StallingCommand;

#[async_trait]
impl BotCommand for StallingCommand {
    async fn execute(&self, _ctx: CommandContext) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Panics inside the command body
#[derive(Debug, Default)]
pub struct PanickingCommand;

#[async_trait]
impl BotCommand for PanickingCommand {
    async fn execute(&self, _ctx: CommandContext) -> Result<()> {
        panic!("command body exploded");
    }
}

/// Blocks until the shared gate is opened, then replies "released"
#[derive(Debug, Clone)]
pub struct GatedCommand {
    pub gate: Arc<Notify>,
}

#[async_trait]
impl BotCommand for GatedCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        self.gate.notified().await;
        ctx.reply("released").await;
        Ok(())
    }
}

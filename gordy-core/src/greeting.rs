// ABOUTME: Greeting vocabulary and per-room greeting cool-down
// ABOUTME: A room gets at most one automatic greeting per cool-down window

use crate::{metrics, outbound::Outbound};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Messages that trigger a greeting, and the pool greetings are drawn from
pub const GREETINGS: &[&str] = &[
    "hi",
    "high",
    "hello",
    "sirs",
    "pals",
    "buddies",
    "friends",
    "amigos",
    "compadres",
    "mates",
    "chums",
    "confidants",
    "brothers",
    "ÜŔ ŮŔ Æ Æ Æ",
    "good day",
    "waddup",
    "howdy",
    "whats good fam",
];

/// Minimum time between two automatic greetings in the same room
pub const GREETING_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Whether a message body (after trimming) is an exact, case-sensitive greeting
pub fn is_greeting(body: &str) -> bool {
    GREETINGS.contains(&body.trim())
}

/// Pick a greeting uniformly at random
pub fn pick_greeting() -> &'static str {
    GREETINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("hi")
}

/// What happened when a greeting was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreetingOutcome {
    /// A greeting was sent
    Sent(String),
    /// The room was greeted too recently
    CoolingDown,
    /// The cool-down was claimed but the transport rejected the send
    SendFailed,
}

/// Per-room record of the last automatic greeting
#[derive(Debug)]
pub struct GreetingDebouncer {
    cooldown: Duration,
    last_greeting: Mutex<HashMap<String, Instant>>,
}

impl Default for GreetingDebouncer {
    fn default() -> Self {
        Self::new(GREETING_COOLDOWN)
    }
}

impl GreetingDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_greeting: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Claim the greeting slot for `room_id` if the cool-down has elapsed.
    ///
    /// Check and record happen under one lock, so concurrent callers for the same
    /// room get at most one `true` per window. The timestamp is recorded at claim
    /// time, before any send, so a slow send cannot let a second greeting through.
    pub fn try_claim(&self, room_id: &str) -> bool {
        let now = Instant::now();
        let mut last = self.last_greeting.lock().unwrap_or_else(|e| e.into_inner());

        let due = match last.get(room_id) {
            Some(previous) => now.duration_since(*previous) > self.cooldown,
            None => true,
        };

        if due {
            last.insert(room_id.to_string(), now);
        }
        due
    }

    /// When `room_id` was last greeted, if ever
    pub fn last_greeted(&self, room_id: &str) -> Option<Instant> {
        self.last_greeting
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(room_id)
            .copied()
    }

    /// Send a random greeting to `room_id` unless it is cooling down
    pub async fn maybe_greet(&self, room_id: &str, outbound: &Outbound) -> GreetingOutcome {
        if !self.try_claim(room_id) {
            tracing::debug!(room_id, "Greeting suppressed, room is cooling down");
            return GreetingOutcome::CoolingDown;
        }

        let greeting = pick_greeting();
        if outbound.send_text(room_id, greeting).await {
            metrics::record_greeting();
            tracing::info!(room_id, greeting, "Greeted room");
            GreetingOutcome::Sent(greeting.to_string())
        } else {
            GreetingOutcome::SendFailed
        }
    }
}

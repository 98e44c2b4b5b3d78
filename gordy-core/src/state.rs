// ABOUTME: Process-lifetime state shared between invocations of the same command
// ABOUTME: One lazily created JSON slot per command name, nothing is persisted

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A command's state blob. Every invocation of one command name holds the same slot.
pub type StateSlot = Arc<tokio::sync::Mutex<Value>>;

/// Map from command name to its state slot
#[derive(Debug, Default)]
pub struct BotState {
    slots: Mutex<HashMap<String, StateSlot>>,
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for `command`, creating an empty JSON object on first use
    pub fn slot(&self, command: &str) -> StateSlot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            slots
                .entry(command.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Value::Object(Map::new())))),
        )
    }

    /// Whether a slot has been created for `command`
    pub fn has_slot(&self, command: &str) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(command)
    }
}

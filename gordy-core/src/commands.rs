// ABOUTME: Command contract, invocation parsing, and the name-to-factory command registry
// ABOUTME: Commands are registered explicitly at startup and resolved by exact name

use crate::{
    outbound::Outbound,
    state::StateSlot,
    traits::{ImagePayload, TextMessage},
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Invocation Parsing
// =============================================================================

/// A command invocation parsed from a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The command name (without prefix), case preserved
    pub name: String,
    /// Whitespace-separated arguments after the name
    pub args: Vec<String>,
    /// The raw argument text after the name, trimmed
    pub raw_args: String,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        let raw_args = args.join(" ");
        Self {
            name: name.into(),
            args,
            raw_args,
        }
    }

    /// Get the first argument if present
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }

    /// Arguments joined by single spaces, the usual shape of a search query
    pub fn query(&self) -> String {
        self.args.join(" ")
    }
}

/// Parse `<prefix><name>[ <args>...]` from a message body.
///
/// Returns `None` when the body does not start with `prefix` or when nothing
/// follows the prefix. The body is not trimmed before the prefix check, so
/// `" !help"` is ordinary chat.
pub fn parse_invocation(body: &str, prefix: char) -> Option<Invocation> {
    let rest = body.strip_prefix(prefix)?;
    let rest = rest.trim_start();

    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?;
    let args: Vec<String> = tokens.map(str::to_string).collect();
    let raw_args = rest[name.len()..].trim().to_string();

    Some(Invocation {
        name: name.to_string(),
        args,
        raw_args,
    })
}

// =============================================================================
// Command Contract
// =============================================================================

/// Everything a command body gets to work with for one invocation
#[derive(Clone)]
pub struct CommandContext {
    /// The room the invocation came from, where replies go
    pub room_id: String,
    /// The triggering message
    pub message: TextMessage,
    /// Parsed name and arguments
    pub invocation: Invocation,
    /// Reply channel
    pub outbound: Outbound,
    /// This command's shared state slot. Concurrent invocations of the same
    /// command see the same slot.
    pub state: StateSlot,
    /// The registry this command was resolved from
    pub registry: Arc<CommandRegistry>,
}

impl CommandContext {
    pub fn args(&self) -> &[String] {
        &self.invocation.args
    }

    /// Reply in the originating room with an HTML body
    pub async fn reply(&self, body: &str) -> bool {
        self.outbound.send_text(&self.room_id, body).await
    }

    /// Show the typing hint in the originating room
    pub async fn typing(&self) -> bool {
        self.outbound.typing(&self.room_id).await
    }

    /// Upload and post an image in the originating room
    pub async fn reply_image(&self, image: ImagePayload) -> bool {
        self.outbound.send_image(&self.room_id, image).await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("room_id", &self.room_id)
            .field("invocation", &self.invocation)
            .finish()
    }
}

/// A chat command. One instance is created per invocation.
#[async_trait]
pub trait BotCommand: Send + Sync {
    /// Run the command. Errors are logged by the runner and never reach the sender.
    async fn execute(&self, ctx: CommandContext) -> Result<()>;
}

/// Builds a fresh command instance
pub type CommandFactory = Arc<dyn Fn() -> Box<dyn BotCommand> + Send + Sync>;

/// Registry entry: name, help text, and how to build the command
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub documentation: String,
    factory: CommandFactory,
}

impl CommandDescriptor {
    pub fn new<F>(name: impl Into<String>, documentation: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn BotCommand> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            documentation: documentation.into(),
            factory: Arc::new(factory),
        }
    }

    /// Descriptor for a stateless command type built with `Default`
    pub fn of<C>(name: impl Into<String>, documentation: impl Into<String>) -> Self
    where
        C: BotCommand + Default + 'static,
    {
        Self::new(name, documentation, || {
            Box::new(C::default()) as Box<dyn BotCommand>
        })
    }

    pub fn instantiate(&self) -> Box<dyn BotCommand> {
        (self.factory)()
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("documentation", &self.documentation)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Name-to-descriptor map, filled before the event loop starts and read-only after.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, overwriting any previous entry with the same name.
    ///
    /// The displaced descriptor is returned so callers can detect collisions;
    /// the last registration wins either way.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Option<CommandDescriptor> {
        let name = descriptor.name.clone();
        let previous = self.commands.insert(name.clone(), descriptor);
        if previous.is_some() {
            tracing::warn!(command = %name, "Command registered twice, last registration wins");
        } else {
            tracing::debug!(command = %name, "Command registered");
        }
        previous
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Descriptors sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

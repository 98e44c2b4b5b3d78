// ABOUTME: Message classifier and dispatcher: decides ignore, greet, or run a command
// ABOUTME: Commands run on their own tasks so one slow command never holds up the next event

use crate::{
    commands::{parse_invocation, CommandRegistry},
    greeting::{is_greeting, GreetingDebouncer, GreetingOutcome},
    outbound::Outbound,
    runner::{CommandReport, CommandRunner, DEFAULT_COMMAND_TIMEOUT},
    state::BotState,
    traits::TextMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default command prefix
pub const DEFAULT_COMMAND_PREFIX: char = '!';

/// Dispatcher settings, resolved from configuration
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub command_prefix: char,
    pub command_timeout: Duration,
    pub greeting_cooldown: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_COMMAND_PREFIX,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            greeting_cooldown: crate::greeting::GREETING_COOLDOWN,
        }
    }
}

/// A command invocation running in the background
#[derive(Debug)]
pub struct CommandTask {
    pub name: String,
    handle: JoinHandle<Option<CommandReport>>,
}

impl CommandTask {
    /// Wait for the invocation to finish
    pub async fn join(self) -> Option<CommandReport> {
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(command = %self.name, error = %e, "Command task did not finish");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// What the dispatcher did with one text message
#[derive(Debug, Default)]
pub struct Dispatch {
    /// The message was the agent's own and was dropped
    pub self_authored: bool,
    /// Set when the body was a greeting trigger
    pub greeting: Option<GreetingOutcome>,
    /// Set when the body named a registered command
    pub command: Option<CommandTask>,
}

impl Dispatch {
    fn self_authored() -> Self {
        Self {
            self_authored: true,
            ..Self::default()
        }
    }

    /// Nothing was triggered
    pub fn is_ignored(&self) -> bool {
        self.greeting.is_none() && self.command.is_none()
    }
}

/// The dispatcher. One per process.
pub struct Bot {
    outbound: Outbound,
    command_prefix: char,
    runner: Arc<CommandRunner>,
    greeter: GreetingDebouncer,
}

impl Bot {
    pub fn new(outbound: Outbound, registry: CommandRegistry, settings: BotSettings) -> Self {
        let runner = CommandRunner::new(
            Arc::new(registry),
            Arc::new(BotState::new()),
            outbound.clone(),
            settings.command_timeout,
        );

        tracing::info!(
            prefix = %settings.command_prefix,
            commands = ?runner.registry().names(),
            timeout_secs = settings.command_timeout.as_secs(),
            "Bot dispatcher ready"
        );

        Self {
            outbound,
            command_prefix: settings.command_prefix,
            runner: Arc::new(runner),
            greeter: GreetingDebouncer::new(settings.greeting_cooldown),
        }
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn command_prefix(&self) -> char {
        self.command_prefix
    }

    pub fn runner(&self) -> &Arc<CommandRunner> {
        &self.runner
    }

    pub fn greeter(&self) -> &GreetingDebouncer {
        &self.greeter
    }

    /// Classify one text message and react to it.
    ///
    /// Greeting and command checks are independent; a body that matched both
    /// would trigger both. The command, if any, is spawned and returned unawaited.
    pub async fn process_message(&self, message: TextMessage) -> Dispatch {
        if message.sender == self.outbound.own_user_id() {
            return Dispatch::self_authored();
        }

        let mut dispatch = Dispatch::default();

        if is_greeting(&message.body) {
            dispatch.greeting = Some(self.maybe_greet(&message.room_id).await);
        }

        if let Some(invocation) = parse_invocation(&message.body, self.command_prefix) {
            if self.runner.registry().contains(&invocation.name) {
                let name = invocation.name.clone();
                let runner = Arc::clone(&self.runner);
                let handle =
                    tokio::spawn(async move { runner.run_command(invocation, message).await });
                dispatch.command = Some(CommandTask { name, handle });
            } else {
                tracing::debug!(command = %invocation.name, "Ignoring unknown command");
            }
        }

        dispatch
    }

    /// Greet `room_id` unless it was greeted within the cool-down window
    pub async fn maybe_greet(&self, room_id: &str) -> GreetingOutcome {
        self.greeter.maybe_greet(room_id, &self.outbound).await
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("own_user_id", &self.outbound.own_user_id())
            .field("command_prefix", &self.command_prefix)
            .field("runner", &self.runner)
            .finish()
    }
}

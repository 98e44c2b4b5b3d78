// ABOUTME: Executes one resolved command with a time bound and failure isolation
// ABOUTME: Every invocation ends in a CommandReport; nothing from a command body propagates

use crate::{
    commands::{CommandContext, CommandRegistry, Invocation},
    metrics,
    outbound::Outbound,
    state::BotState,
    traits::TextMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default per-invocation time budget
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How a command invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// The body returned an error or panicked
    Failed(String),
    /// The body did not finish within the time budget
    TimedOut(Duration),
}

impl CommandOutcome {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            CommandOutcome::Completed => "completed",
            CommandOutcome::Failed(_) => "failed",
            CommandOutcome::TimedOut(_) => "timed_out",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CommandOutcome::Completed)
    }
}

/// Result of one invocation, with its wall-clock duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub name: String,
    pub outcome: CommandOutcome,
    pub elapsed: Duration,
}

/// Resolves, instantiates, and runs commands
pub struct CommandRunner {
    registry: Arc<CommandRegistry>,
    state: Arc<BotState>,
    outbound: Outbound,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(
        registry: Arc<CommandRegistry>,
        state: Arc<BotState>,
        outbound: Outbound,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            state,
            outbound,
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the command named by `invocation` in response to `message`.
    ///
    /// Returns `None` without any outbound effect when the name is not registered.
    /// The body runs in its own task: a panic is reported as `Failed`, and on
    /// timeout the task is aborted (best effort, in-flight I/O may still finish).
    pub async fn run_command(
        &self,
        invocation: Invocation,
        message: TextMessage,
    ) -> Option<CommandReport> {
        let Some(descriptor) = self.registry.resolve(&invocation.name) else {
            tracing::debug!(command = %invocation.name, "Ignoring unknown command");
            return None;
        };

        let name = descriptor.name.clone();
        let command = descriptor.instantiate();
        let ctx = CommandContext {
            room_id: message.room_id.clone(),
            state: self.state.slot(&name),
            registry: Arc::clone(&self.registry),
            outbound: self.outbound.clone(),
            invocation,
            message,
        };
        let room_id = ctx.room_id.clone();

        tracing::debug!(command = %name, room_id = %room_id, args = ?ctx.invocation.args, "Running command");

        let started = Instant::now();
        let mut task = tokio::spawn(async move { command.execute(ctx).await });

        let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(()))) => CommandOutcome::Completed,
            Ok(Ok(Err(e))) => CommandOutcome::Failed(format!("{:#}", e)),
            Ok(Err(join_error)) => {
                if join_error.is_panic() {
                    CommandOutcome::Failed("command panicked".to_string())
                } else {
                    CommandOutcome::Failed(format!("command task ended: {}", join_error))
                }
            }
            Err(_) => {
                task.abort();
                CommandOutcome::TimedOut(self.timeout)
            }
        };
        let elapsed = started.elapsed();

        match &outcome {
            CommandOutcome::Completed => {}
            CommandOutcome::Failed(error) => {
                tracing::error!(command = %name, room_id = %room_id, error = %error, "Error running command");
            }
            CommandOutcome::TimedOut(limit) => {
                tracing::warn!(
                    command = %name,
                    room_id = %room_id,
                    timeout_ms = limit.as_millis() as u64,
                    "Command timed out"
                );
            }
        }

        metrics::record_command(&name, outcome.label(), elapsed);
        tracing::info!(
            command = %name,
            outcome = outcome.label(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "command {} took {:.2}ms",
            name,
            elapsed.as_secs_f64() * 1000.0
        );

        Some(CommandReport {
            name,
            outcome,
            elapsed,
        })
    }
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("commands", &self.registry.names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandDescriptor;
    use crate::testing::{EchoCommand, FailingCommand, PanickingCommand, RecordingGateway, StallingCommand};

    fn runner(gateway: Arc<RecordingGateway>, timeout: Duration) -> CommandRunner {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::of::<EchoCommand>("echo", "Echo arguments"));
        registry.register(CommandDescriptor::of::<FailingCommand>("fail", "Always fails"));
        registry.register(CommandDescriptor::of::<StallingCommand>("stall", "Never finishes"));
        registry.register(CommandDescriptor::of::<PanickingCommand>("panic", "Panics"));

        CommandRunner::new(
            Arc::new(registry),
            Arc::new(BotState::new()),
            Outbound::new(gateway),
            timeout,
        )
    }

    fn message(body: &str) -> TextMessage {
        TextMessage::new("!room:test", "@alice:test", body)
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), DEFAULT_COMMAND_TIMEOUT);

        let report = runner
            .run_command(Invocation::new("nope", vec![]), message("!nope"))
            .await;

        assert!(report.is_none());
        assert!(gateway.outgoing().is_empty());
    }

    #[tokio::test]
    async fn test_completed_command() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), DEFAULT_COMMAND_TIMEOUT);

        let report = runner
            .run_command(
                Invocation::new("echo", vec!["a".into(), "b".into()]),
                message("!echo a b"),
            )
            .await
            .unwrap();

        assert_eq!(report.name, "echo");
        assert_eq!(report.outcome, CommandOutcome::Completed);
        assert_eq!(gateway.texts_in("!room:test"), vec!["a b".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_is_contained() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), DEFAULT_COMMAND_TIMEOUT);

        let report = runner
            .run_command(Invocation::new("fail", vec![]), message("!fail"))
            .await
            .unwrap();

        match report.outcome {
            CommandOutcome::Failed(reason) => assert!(reason.contains("deliberate failure")),
            other => panic!("expected failure, got {:?}", other),
        }
        // The reply sent before failing stays sent
        assert_eq!(gateway.texts_in("!room:test"), vec!["about to fail".to_string()]);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), DEFAULT_COMMAND_TIMEOUT);

        let report = runner
            .run_command(Invocation::new("panic", vec![]), message("!panic"))
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            CommandOutcome::Failed("command panicked".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), Duration::from_secs(5));

        let report = runner
            .run_command(Invocation::new("stall", vec![]), message("!stall"))
            .await
            .unwrap();

        assert_eq!(report.outcome, CommandOutcome::TimedOut(Duration::from_secs(5)));
        assert!(report.elapsed >= Duration::from_secs(5));
        assert_eq!(report.outcome.label(), "timed_out");
    }

    #[tokio::test]
    async fn test_invocations_share_state_slot() {
        let gateway = RecordingGateway::new("@bot:test");
        let runner = runner(gateway.clone(), DEFAULT_COMMAND_TIMEOUT);

        for _ in 0..3 {
            runner
                .run_command(Invocation::new("echo", vec!["x".into()]), message("!echo x"))
                .await
                .unwrap();
        }

        let slot = runner.state().slot("echo");
        assert_eq!(slot.lock().await["invocations"], 3);
    }
}

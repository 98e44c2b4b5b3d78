// ABOUTME: Transport-agnostic event dispatch and command routing for the gordy chat agent
// ABOUTME: Provides the gateway trait, command registry, runner, greeting debounce, and dispatcher

pub mod adapter;
pub mod bot;
pub mod commands;
pub mod config;
pub mod greeting;
pub mod metrics;
pub mod outbound;
pub mod paths;
pub mod runner;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;
pub mod utils;

pub use adapter::{EventAdapter, Handled};
pub use bot::{Bot, BotSettings, CommandTask, Dispatch};
pub use commands::{
    parse_invocation, BotCommand, CommandContext, CommandDescriptor, CommandRegistry, Invocation,
};
pub use greeting::{GreetingDebouncer, GreetingOutcome};
pub use outbound::Outbound;
pub use runner::{CommandOutcome, CommandReport, CommandRunner};
pub use state::{BotState, StateSlot};
pub use traits::{
    ContentRef, GatewayError, GatewayResult, ImageInfo, ImagePayload, MessageGateway, RoomEvent,
    TextMessage,
};

// ABOUTME: Built-in chat commands and their explicit registration
// ABOUTME: HTTP-backed commands share one reqwest client with a bounded timeout

pub mod dice;
pub mod help;
pub mod imdb;
pub mod random;
pub mod strain;
pub mod urban;

use anyhow::{Context, Result};
use gordy_core::{BotCommand, CommandDescriptor, CommandRegistry};
use std::time::Duration;

pub use dice::DiceCommand;
pub use help::HelpCommand;
pub use imdb::ImdbCommand;
pub use random::RandomCommand;
pub use strain::StrainCommand;
pub use urban::UrbanDictionaryCommand;

/// Upper bound for any single third-party lookup
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("gordy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Register every built-in command
pub fn register_builtin(registry: &mut CommandRegistry, http: reqwest::Client) {
    registry.register(CommandDescriptor::of::<HelpCommand>(
        "help",
        "List available commands",
    ));
    registry.register(CommandDescriptor::of::<RandomCommand>(
        "random",
        "Pick a random choice",
    ));

    let ud_http = http.clone();
    registry.register(CommandDescriptor::new(
        "ud",
        "Search UrbanDictionary",
        move || Box::new(UrbanDictionaryCommand::new(ud_http.clone())) as Box<dyn BotCommand>,
    ));

    let imdb_http = http.clone();
    registry.register(CommandDescriptor::new(
        "imdb",
        "Search IMDb",
        move || Box::new(ImdbCommand::new(imdb_http.clone())) as Box<dyn BotCommand>,
    ));

    let strain_http = http;
    registry.register(CommandDescriptor::new(
        "strain",
        "Search Leafly",
        move || Box::new(StrainCommand::new(strain_http.clone())) as Box<dyn BotCommand>,
    ));

    registry.register(CommandDescriptor::of::<DiceCommand>(
        "dice",
        "Roll an animated die",
    ));

    tracing::info!(commands = ?registry.names(), "Built-in commands registered");
}

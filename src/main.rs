// ABOUTME: Main entry point for the gordy Matrix agent with its sync loop
// ABOUTME: Initializes logging, config, the Matrix client, command registry, and event handlers

use anyhow::{Context, Result};
use clap::Parser;
use gordy::{
    commands,
    config::Config,
    matrix_client,
    platform::{register_event_handlers, MatrixGateway},
    Bot, CommandRegistry, EventAdapter, Outbound,
};
use gordy_core::RoomEvent;
use matrix_sdk::{config::SyncSettings, Client};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Default to info, but keep the SDK's crypto chatter and HTTP stack quiet
const DEFAULT_LOG_FILTER: &str =
    "info,matrix_sdk_crypto=warn,matrix_sdk_base=warn,hyper=warn,reqwest=warn";

#[derive(Parser, Debug)]
#[command(name = "gordy", version, about = "Matrix chat agent that greets rooms and answers !commands")]
struct Args {
    /// Homeserver to connect to
    #[arg(long)]
    homeserver: Option<String>,

    /// User to log in as
    #[arg(long)]
    user: Option<String>,

    /// Register the user before logging in
    #[arg(long)]
    register: bool,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\ngordy panicked:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    let args = Args::parse();

    // .env first so RUST_LOG and MATRIX_* from it are visible below
    dotenvy::dotenv().ok();

    init_tracing(args.json);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting gordy");

    let config = load_config(&args)?;

    tracing::info!(
        homeserver = %config.matrix.home_server,
        user_id = %config.matrix.user_id,
        device = %config.matrix.device_name,
        prefix = %config.bot.command_prefix,
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_listen() {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let password = match config.matrix.password.clone() {
        Some(password) => password,
        None => prompt_password(args.register)?,
    };

    tracing::info!(homeserver = %config.matrix.home_server, "Connecting...");
    let client =
        matrix_client::create_client(&config.matrix.home_server, &config.store_path()).await?;

    matrix_client::sign_in(
        &client,
        &config.matrix.user_id,
        &password,
        &config.matrix.device_name,
        args.register,
    )
    .await?;

    let gateway = Arc::new(MatrixGateway::new(client.clone())?);
    let outbound = Outbound::new(gateway);

    let mut registry = CommandRegistry::new();
    commands::register_builtin(&mut registry, commands::http_client()?);

    let bot = Arc::new(Bot::new(outbound, registry, config.bot_settings()));
    let adapter = EventAdapter::new(Arc::clone(&bot));

    // Initial sync uploads device keys and records a sync token, so the
    // handlers registered afterwards never see the room backlog
    tracing::info!("Performing initial sync...");
    client
        .sync_once(SyncSettings::default())
        .await
        .context("Initial sync failed")?;
    tracing::info!("Initial sync complete");

    register_event_handlers(&client, adapter.clone());
    join_pending_invites(&client, &adapter).await;

    if config.bot.greet_on_startup {
        for room in client.joined_rooms() {
            bot.maybe_greet(room.room_id().as_str()).await;
        }
    }

    tracing::info!("Bot ready");

    tokio::select! {
        _ = sync_forever(&client, config.sync_timeout(), config.sync_retry_delay()) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// File and environment, then CLI flags, then validation
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load_from(args.config.as_deref())?;
    if let Some(homeserver) = &args.homeserver {
        config.matrix.home_server = homeserver.clone();
    }
    if let Some(user) = &args.user {
        config.matrix.user_id = user.clone();
    }
    config.validate()?;
    Ok(config)
}

fn prompt_password(register: bool) -> Result<String> {
    let password = dialoguer::Password::new()
        .with_prompt("password?")
        .allow_empty_password(false)
        .interact()
        .context("Failed to read password")?;

    if register {
        let confirm = dialoguer::Password::new()
            .with_prompt("confirm password?")
            .interact()
            .context("Failed to read password confirmation")?;
        if confirm != password {
            anyhow::bail!("Passwords do not match");
        }
    }

    Ok(password)
}

/// Invites that arrived while offline were consumed by the initial sync
async fn join_pending_invites(client: &Client, adapter: &EventAdapter) {
    let own_user_id = adapter.bot().outbound().own_user_id().to_string();
    for room in client.invited_rooms() {
        let inviter = match room.invite_details().await {
            Ok(details) => details
                .inviter
                .map(|member| member.user_id().to_string())
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, room_id = %room.room_id(), "No invite details");
                String::new()
            }
        };
        adapter
            .handle(RoomEvent::InviteReceived {
                room_id: room.room_id().to_string(),
                target_user: own_user_id.clone(),
                inviter,
            })
            .await;
    }
}

/// Keep syncing; on failure wait a fixed delay and resume from the stored token
async fn sync_forever(client: &Client, timeout: Duration, retry_delay: Duration) {
    let settings = SyncSettings::default().timeout(timeout);
    loop {
        tracing::info!("Starting continuous sync loop");
        match client.sync(settings.clone()).await {
            Ok(()) => tracing::warn!("Sync loop ended unexpectedly"),
            Err(e) => tracing::warn!(
                error = %e,
                retry_secs = retry_delay.as_secs(),
                "Unable to sync with homeserver, retrying"
            ),
        }
        tokio::time::sleep(retry_delay).await;
    }
}

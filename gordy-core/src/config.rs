// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones
use crate::{bot::BotSettings, greeting::GREETING_COOLDOWN, paths};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub home_server: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Where the client keeps its sync and crypto state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            home_server: String::new(),
            user_id: String::new(),
            password: None,
            device_name: default_device_name(),
            store_path: None,
        }
    }
}

// Custom Debug impl to redact sensitive fields
impl std::fmt::Debug for MatrixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixConfig")
            .field("home_server", &self.home_server)
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("device_name", &self.device_name)
            .field("store_path", &self.store_path)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: char,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Greet every joined room once the first sync completes
    #[serde(default = "default_true")]
    pub greet_on_startup: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            command_timeout_secs: default_command_timeout_secs(),
            greet_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Long-poll timeout for each sync request
    #[serde(default = "default_sync_timeout_ms")]
    pub timeout_ms: u64,
    /// Fixed delay before restarting a failed sync loop
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_sync_timeout_ms(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus exporter; disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}

fn default_device_name() -> String {
    "gordy".to_string()
}

fn default_command_prefix() -> char {
    crate::bot::DEFAULT_COMMAND_PREFIX
}

fn default_command_timeout_secs() -> u64 {
    crate::runner::DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_sync_timeout_ms() -> u64 {
    30_000
}

fn default_retry_delay_secs() -> u64 {
    15
}

impl Config {
    /// Load, apply env overrides, and validate
    pub fn load() -> Result<Self> {
        let config = Self::load_from(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or the default search path) and apply environment
    /// overrides, without validating. Callers that layer CLI flags on top
    /// validate afterwards.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(ref p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read {}", p.display()))?;
                let config = toml::from_str::<Config>(&content)
                    .with_context(|| format!("Failed to parse {}", p.display()))?;
                tracing::debug!(path = %p.display(), "Loaded config file");
                config
            }
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// GORDY_CONFIG_PATH, then ./config.toml, then the XDG config file
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(val) = std::env::var("GORDY_CONFIG_PATH") {
            return Some(PathBuf::from(val));
        }
        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Some(local);
        }
        let xdg = paths::config_file();
        xdg.exists().then_some(xdg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("MATRIX_HOME_SERVER") {
            self.matrix.home_server = val;
        }
        if let Ok(val) = std::env::var("MATRIX_USER_ID") {
            self.matrix.user_id = val;
        }
        if let Ok(val) = std::env::var("MATRIX_PASSWORD") {
            self.matrix.password = Some(val);
        }
        if let Ok(val) = std::env::var("MATRIX_DEVICE_NAME") {
            self.matrix.device_name = val;
        }
        if let Ok(val) = std::env::var("MATRIX_STORE_PATH") {
            self.matrix.store_path = Some(val);
        }
        if let Ok(val) = std::env::var("GORDY_COMMAND_PREFIX") {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.bot.command_prefix = c,
                _ => anyhow::bail!(
                    "GORDY_COMMAND_PREFIX must be a single character, got: {:?}",
                    val
                ),
            }
        }
        if let Ok(val) = std::env::var("GORDY_COMMAND_TIMEOUT_SECS") {
            self.bot.command_timeout_secs = val.parse().with_context(|| {
                format!("GORDY_COMMAND_TIMEOUT_SECS must be a number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("GORDY_GREET_ON_STARTUP") {
            self.bot.greet_on_startup = val.parse().with_context(|| {
                format!("GORDY_GREET_ON_STARTUP must be true or false, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("GORDY_SYNC_RETRY_SECS") {
            self.sync.retry_delay_secs = val.parse().with_context(|| {
                format!("GORDY_SYNC_RETRY_SECS must be a number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("GORDY_METRICS_LISTEN") {
            self.metrics.listen = Some(val);
        }
        Ok(())
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.matrix.home_server.trim().is_empty() {
            anyhow::bail!(
                "matrix.home_server is required (set in config.toml, MATRIX_HOME_SERVER, or --homeserver)"
            );
        }
        let user_id = self.matrix.user_id.trim();
        if user_id.is_empty() {
            anyhow::bail!(
                "matrix.user_id is required (set in config.toml, MATRIX_USER_ID, or --user)"
            );
        }
        if user_id.starts_with('@') && !user_id.contains(':') {
            anyhow::bail!("Invalid Matrix user ID: {}", user_id);
        }
        if self.bot.command_prefix.is_whitespace() {
            anyhow::bail!("bot.command_prefix must not be whitespace");
        }
        if self.bot.command_timeout_secs == 0 {
            anyhow::bail!("bot.command_timeout_secs must be greater than zero");
        }
        if self.sync.retry_delay_secs == 0 {
            anyhow::bail!("sync.retry_delay_secs must be greater than zero");
        }
        if let Some(listen) = &self.metrics.listen {
            listen
                .parse::<SocketAddr>()
                .with_context(|| format!("metrics.listen is not a socket address: {}", listen))?;
        }
        Ok(())
    }

    /// Dispatcher settings derived from the `[bot]` section
    pub fn bot_settings(&self) -> BotSettings {
        BotSettings {
            command_prefix: self.bot.command_prefix,
            command_timeout: Duration::from_secs(self.bot.command_timeout_secs),
            greeting_cooldown: GREETING_COOLDOWN,
        }
    }

    /// State store directory, isolated per user and device
    pub fn store_path(&self) -> PathBuf {
        match &self.matrix.store_path {
            Some(path) => PathBuf::from(path),
            None => paths::store_dir().join(format!(
                "{}_{}",
                paths::slugify(&self.matrix.user_id),
                paths::slugify(&self.matrix.device_name)
            )),
        }
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync.timeout_ms)
    }

    pub fn sync_retry_delay(&self) -> Duration {
        Duration::from_secs(self.sync.retry_delay_secs)
    }

    pub fn metrics_listen(&self) -> Option<SocketAddr> {
        self.metrics.listen.as_ref().and_then(|l| l.parse().ok())
    }
}

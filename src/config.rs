//! Configuration loader and validator for the channel-forwarding bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Directory holding the three JSON store files.
    pub data_dir: String,
    /// Idle sleep between mode checks while in one-shot mode.
    #[serde(default = "default_idle_seconds")]
    pub idle_seconds: u64,
    /// Cooldown after an error inside one scheduler iteration.
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_seconds: u64,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    pub owner_id: u64,
    #[serde(default)]
    pub admin_ids: Vec<u64>,
    /// The single channel whose new posts are forwarding candidates.
    pub source_channel_id: i64,
    /// Optional outbound proxy URL for the Bot API client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

fn default_idle_seconds() -> u64 {
    5
}

fn default_error_cooldown() -> u64 {
    5
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Whether `uid` may use the admin surface.
    pub fn is_admin(&self, uid: u64) -> bool {
        uid == self.telegram.owner_id || self.telegram.admin_ids.contains(&uid)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.idle_seconds == 0 {
        return Err(ConfigError::Invalid("app.idle_seconds must be > 0"));
    }
    if cfg.app.error_cooldown_seconds == 0 {
        return Err(ConfigError::Invalid("app.error_cooldown_seconds must be > 0"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }
    if cfg.telegram.owner_id == 0 {
        return Err(ConfigError::Invalid("telegram.owner_id must be non-zero"));
    }
    if cfg.telegram.source_channel_id == 0 {
        return Err(ConfigError::Invalid("telegram.source_channel_id must be non-zero"));
    }
    if let Some(proxy) = &cfg.telegram.proxy_url {
        if proxy.trim().is_empty() {
            return Err(ConfigError::Invalid("telegram.proxy_url must be non-empty when set"));
        }
    }

    Ok(())
}

/// Canonical example configuration, used by tests and as documentation.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  idle_seconds: 5
  error_cooldown_seconds: 5

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  owner_id: 123456789
  admin_ids:
    - 987654321
  source_channel_id: -1001234567890
"#
}

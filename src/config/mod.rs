#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Cli, Command, LogFormat};

use crate::adapters::discord::DEFAULT_API_BASE;
use crate::adapters::feed::DEFAULT_FEED_KEY;
use crate::core::command::DEFAULT_PREFIX;
use crate::core::render::DEFAULT_FOOTER;
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{self, Validate};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_STATE_PATH: &str = "sent_games.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;
pub const DEFAULT_COMMAND_POLL_SECONDS: u64 = 5;

/// Everything the bot needs at runtime. Credentials and destinations are
/// always supplied from outside (environment or config file).
#[derive(Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub discord_token: String,
    pub channel_id: String,
    pub discord_api_base: String,
    pub feed_url: String,
    pub feed_key: String,
    pub interval_minutes: u64,
    pub state_path: String,
    pub request_timeout_seconds: u64,
    pub commands_enabled: bool,
    pub command_prefix: String,
    pub command_poll_seconds: u64,
    pub footer: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("discord_api_base", &self.discord_api_base)
            .field("feed_url", &self.feed_url)
            .field("feed_key", &self.feed_key)
            .field("interval_minutes", &self.interval_minutes)
            .field("state_path", &self.state_path)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("commands_enabled", &self.commands_enabled)
            .field("command_prefix", &self.command_prefix)
            .field("command_poll_seconds", &self.command_poll_seconds)
            .field("footer", &self.footer)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str, field: &str| {
            get(key).ok_or_else(|| BotError::MissingConfigError {
                field: format!("{} ({})", field, key),
            })
        };

        Ok(Self {
            discord_token: required("DISCORD_TOKEN", "discord_token")?,
            channel_id: required("DISCORD_CHANNEL_ID", "channel_id")?,
            discord_api_base: get("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            feed_url: required("FEED_URL", "feed_url")?,
            feed_key: get("FEED_KEY").unwrap_or_else(|| DEFAULT_FEED_KEY.to_string()),
            interval_minutes: parse_or(
                "POLL_INTERVAL_MINUTES",
                get("POLL_INTERVAL_MINUTES"),
                DEFAULT_INTERVAL_MINUTES,
            )?,
            state_path: get("SEEN_STATE_PATH").unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            request_timeout_seconds: parse_or(
                "REQUEST_TIMEOUT_SECONDS",
                get("REQUEST_TIMEOUT_SECONDS"),
                DEFAULT_TIMEOUT_SECONDS,
            )?,
            commands_enabled: parse_bool("COMMANDS_ENABLED", get("COMMANDS_ENABLED"), true)?,
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            command_poll_seconds: parse_or(
                "COMMAND_POLL_SECONDS",
                get("COMMAND_POLL_SECONDS"),
                DEFAULT_COMMAND_POLL_SECONDS,
            )?,
            footer: get("ANNOUNCE_FOOTER").unwrap_or_else(|| DEFAULT_FOOTER.to_string()),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_secs(self.command_poll_seconds)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| BotError::InvalidConfigValueError {
            field: key.to_string(),
            value,
            reason: "Expected a whole number".to_string(),
        }),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BotError::InvalidConfigValueError {
            field: key.to_string(),
            value,
            reason: "Expected true or false".to_string(),
        }),
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("discord_token", &self.discord_token)?;
        validation::validate_snowflake("channel_id", &self.channel_id)?;
        validation::validate_url("discord_api_base", &self.discord_api_base)?;
        validation::validate_url("feed_url", &self.feed_url)?;
        validation::validate_non_empty_string("feed_key", &self.feed_key)?;
        validation::validate_range("interval_minutes", self.interval_minutes, 1, 7 * 24 * 60)?;
        validation::validate_path("state_path", &self.state_path)?;
        validation::validate_range(
            "request_timeout_seconds",
            self.request_timeout_seconds,
            1,
            120,
        )?;

        if self.commands_enabled {
            validation::validate_non_empty_string("command_prefix", &self.command_prefix)?;
            if self.command_prefix.chars().any(char::is_whitespace) {
                return Err(BotError::InvalidConfigValueError {
                    field: "command_prefix".to_string(),
                    value: self.command_prefix.clone(),
                    reason: "Prefix cannot contain whitespace".to_string(),
                });
            }
            validation::validate_range("command_poll_seconds", self.command_poll_seconds, 1, 300)?;
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }
}

use crate::adapters::discord::DEFAULT_API_BASE;
use crate::adapters::feed::DEFAULT_FEED_KEY;
use crate::config::{
    BotConfig, DEFAULT_COMMAND_POLL_SECONDS, DEFAULT_INTERVAL_MINUTES, DEFAULT_STATE_PATH,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::command::DEFAULT_PREFIX;
use crate::core::render::DEFAULT_FOOTER;
use crate::utils::error::{BotError, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub discord: DiscordSection,
    pub feed: FeedSection,
    pub schedule: Option<ScheduleSection>,
    pub state: Option<StateSection>,
    pub http: Option<HttpSection>,
    pub commands: Option<CommandsSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSection {
    pub token: String,
    pub channel_id: ChannelIdValue,
    pub api_base: Option<String>,
    pub footer: Option<String>,
}

/// Channel id written either as a TOML integer or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelIdValue {
    Number(u64),
    Text(String),
}

impl ChannelIdValue {
    fn into_string(self) -> String {
        match self {
            ChannelIdValue::Number(n) => n.to_string(),
            ChannelIdValue::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    pub url: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    pub interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateSection {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandsSection {
    pub enabled: Option<bool>,
    pub prefix: Option<String>,
    pub poll_seconds: Option<u64>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| BotError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content, |name| std::env::var(name).ok());
        toml::from_str(&processed).map_err(|e| BotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn into_bot_config(self) -> BotConfig {
        let schedule = self.schedule.unwrap_or(ScheduleSection {
            interval_minutes: None,
        });
        let state = self.state.unwrap_or(StateSection { path: None });
        let http = self.http.unwrap_or(HttpSection {
            timeout_seconds: None,
        });
        let commands = self.commands.unwrap_or(CommandsSection {
            enabled: None,
            prefix: None,
            poll_seconds: None,
        });

        BotConfig {
            discord_token: self.discord.token,
            channel_id: self.discord.channel_id.into_string(),
            discord_api_base: self
                .discord
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            feed_url: self.feed.url,
            feed_key: self.feed.key.unwrap_or_else(|| DEFAULT_FEED_KEY.to_string()),
            interval_minutes: schedule.interval_minutes.unwrap_or(DEFAULT_INTERVAL_MINUTES),
            state_path: state.path.unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            request_timeout_seconds: http.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            commands_enabled: commands.enabled.unwrap_or(true),
            command_prefix: commands.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            command_poll_seconds: commands.poll_seconds.unwrap_or(DEFAULT_COMMAND_POLL_SECONDS),
            footer: self
                .discord
                .footer
                .unwrap_or_else(|| DEFAULT_FOOTER.to_string()),
        }
    }
}

/// Replaces `${VAR}` with the looked-up value. Unknown variables are left as
/// written so validation can point at them.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern");
    re.replace_all(content, |caps: &regex::Captures| {
        let name = &caps[1];
        lookup(name).unwrap_or_else(|| format!("${{{}}}", name))
    })
    .into_owned()
}

use crate::core::render::{render_offer, Embed};
use crate::domain::model::{ChannelId, ChatMessage, Offer};
use crate::domain::ports::{CommandInbox, Notifier};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const MESSAGE_PAGE_LIMIT: u8 = 50;

/// Discord REST client authenticated with a bot token.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "no_embeds")]
    embeds: &'a [Embed],
}

fn no_embeds(embeds: &&[Embed]) -> bool {
    embeds.is_empty()
}

#[derive(Deserialize)]
struct MessagePayload {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    author: Option<AuthorPayload>,
}

#[derive(Deserialize)]
struct AuthorPayload {
    #[serde(default)]
    bot: bool,
}

impl DiscordClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                "DiscordBot (free-games-notifier, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    pub async fn channel_info(&self, channel: &ChannelId) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint(&format!("/channels/{}", channel)))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| delivery_error(None, e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(BotError::config("Discord rejected the bot token")),
            StatusCode::FORBIDDEN => Err(BotError::config(format!(
                "bot has no access to channel {}",
                channel
            ))),
            StatusCode::NOT_FOUND => Err(BotError::InvalidConfigValueError {
                field: "channel_id".to_string(),
                value: channel.to_string(),
                reason: "Channel not found".to_string(),
            }),
            _ => Err(status_error(response).await),
        }
    }

    pub async fn create_message(
        &self,
        channel: &ChannelId,
        content: Option<&str>,
        embeds: &[Embed],
    ) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("/channels/{}/messages", channel)))
            .header("Authorization", self.auth())
            .json(&CreateMessage { content, embeds })
            .send()
            .await
            .map_err(|e| delivery_error(None, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    pub async fn list_messages(
        &self,
        channel: &ChannelId,
        after: Option<&str>,
    ) -> Result<Vec<ChatMessage>> {
        let limit = if after.is_some() { MESSAGE_PAGE_LIMIT } else { 1 };
        let mut request = self
            .client
            .get(self.endpoint(&format!("/channels/{}/messages", channel)))
            .header("Authorization", self.auth())
            .query(&[("limit", limit.to_string())]);
        if let Some(after) = after {
            request = request.query(&[("after", after)]);
        }

        let response = request.send().await.map_err(|e| delivery_error(None, e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let payload: Vec<MessagePayload> = response
            .json()
            .await
            .map_err(|e| delivery_error(None, e))?;
        let mut messages: Vec<ChatMessage> = payload
            .into_iter()
            .map(|m| ChatMessage {
                id: m.id,
                content: m.content,
                author_is_bot: m.author.map(|a| a.bot).unwrap_or(false),
            })
            .collect();
        // Discord returns newest first
        messages.sort_by_key(|m| m.id.parse::<u64>().unwrap_or(0));
        Ok(messages)
    }
}

fn delivery_error(status: Option<u16>, e: impl std::fmt::Display) -> BotError {
    BotError::DeliveryError {
        status,
        message: e.to_string(),
    }
}

async fn status_error(response: Response) -> BotError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        "empty response body".to_string()
    } else {
        body.chars().take(300).collect()
    };
    delivery_error(Some(status), message)
}

/// Posts offers as embeds to a Discord channel.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: DiscordClient,
    footer: String,
}

impl DiscordNotifier {
    pub fn new(client: DiscordClient, footer: impl Into<String>) -> Self {
        Self {
            client,
            footer: footer.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn ready(&self, channel: &ChannelId) -> Result<()> {
        self.client.channel_info(channel).await
    }

    async fn announce(&self, channel: &ChannelId, offer: &Offer) -> Result<()> {
        let embed = render_offer(offer, &self.footer);
        self.client.create_message(channel, None, &[embed]).await
    }

    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.client.create_message(channel, Some(text), &[]).await
    }
}

#[async_trait]
impl CommandInbox for DiscordClient {
    async fn messages_after(
        &self,
        channel: &ChannelId,
        after: Option<&str>,
    ) -> Result<Vec<ChatMessage>> {
        self.list_messages(channel, after).await
    }
}

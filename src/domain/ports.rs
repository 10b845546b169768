use crate::domain::model::{ChannelId, ChatMessage, FetchOutcome, Offer, SeenSet};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persisted set of announced titles.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Never fails: a missing or unreadable file is an empty set.
    async fn load(&self) -> SeenSet;
    async fn save(&self, seen: &SeenSet) -> Result<()>;
}

/// Source of currently free games.
#[async_trait]
pub trait OfferFeed: Send + Sync {
    async fn fetch_offers(&self) -> FetchOutcome;
}

/// Delivery side of the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Checks that the credential works and the channel is reachable.
    async fn ready(&self, channel: &ChannelId) -> Result<()>;
    async fn announce(&self, channel: &ChannelId, offer: &Offer) -> Result<()>;
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()>;
}

/// Read side of the chat platform, polled for manual commands.
#[async_trait]
pub trait CommandInbox: Send + Sync {
    /// Messages newer than `after`, oldest first. With `after = None` only the
    /// newest message is returned, to prime the cursor.
    async fn messages_after(
        &self,
        channel: &ChannelId,
        after: Option<&str>,
    ) -> Result<Vec<ChatMessage>>;
}

use crate::domain::model::{FetchOutcome, Offer};
use crate::domain::ports::OfferFeed;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_FEED_KEY: &str = "epic";

/// Fetches the free games list with a single GET.
#[derive(Debug, Clone)]
pub struct HttpOfferFeed {
    client: Client,
    url: String,
    feed_key: String,
}

impl HttpOfferFeed {
    pub fn new(
        url: impl Into<String>,
        feed_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("free-games-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            feed_key: feed_key.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OfferFeed for HttpOfferFeed {
    async fn fetch_offers(&self) -> FetchOutcome {
        tracing::debug!("Making feed request to: {}", self.url);
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Feed request failed");
                return FetchOutcome::Failed(format!("request failed: {}", e));
            }
        };

        let status = response.status();
        tracing::debug!("Feed response status: {}", status);
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Failed to fetch offers");
            return FetchOutcome::Failed(format!("HTTP {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Feed body is not valid JSON");
                return FetchOutcome::Failed(format!("invalid JSON: {}", e));
            }
        };

        let offers = parse_offers(&body, &self.feed_key);
        tracing::info!(offers = offers.len(), "Fetched free games feed");
        FetchOutcome::from_offers(offers)
    }
}

/// Extracts the offers array under `feed_key`. Malformed entries are skipped
/// one by one so a single bad record cannot hide the rest of the list.
pub fn parse_offers(body: &Value, feed_key: &str) -> Vec<Offer> {
    let entries = match body.get(feed_key) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            tracing::warn!(key = feed_key, "Feed key is not an array");
            return Vec::new();
        }
        None => {
            tracing::warn!(key = feed_key, "Feed response has no offers key");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let offer = parse_offer(entry);
            if offer.is_none() {
                tracing::warn!(position, "Skipping malformed feed entry");
            }
            offer
        })
        .collect()
}

/// The title is kept exactly as the feed sends it since it is the dedup key
/// matched against the seen set.
pub fn parse_offer(entry: &Value) -> Option<Offer> {
    let obj = entry.as_object()?;
    let title = obj.get("title")?.as_str()?;
    if title.trim().is_empty() {
        return None;
    }

    Some(Offer {
        title: title.to_string(),
        url: non_empty_str(obj.get("url")),
        cover_image_url: non_empty_str(obj.get("cover")),
        offer_end_timestamp: obj.get("offer_end_date_timestamp").and_then(timestamp),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

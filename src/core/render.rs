//! Turns an [`Offer`] into the rich message posted to the channel.

use crate::domain::model::Offer;
use chrono::DateTime;
use serde::Serialize;

pub const DEFAULT_FOOTER: &str = "Free Games (Epic Games)";
pub const EXPIRY_FIELD_NAME: &str = "Offer ends";
pub const UNKNOWN_EXPIRY: &str = "unknown";
const ANNOUNCE_COLOR: u32 = 0x00FF00;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

pub fn render_offer(offer: &Offer, footer: &str) -> Embed {
    Embed {
        title: offer.title.clone(),
        description: format!("🎉 **Free game!**\n{}", offer.title),
        url: offer.url.clone(),
        color: ANNOUNCE_COLOR,
        image: offer
            .cover_image_url
            .as_ref()
            .map(|url| EmbedImage { url: url.clone() }),
        fields: vec![EmbedField {
            name: EXPIRY_FIELD_NAME.to_string(),
            value: format_expiry(offer.offer_end_timestamp),
            inline: false,
        }],
        footer: EmbedFooter {
            text: footer.to_string(),
        },
    }
}

/// Discord timestamp markup, rendered in each reader's local time zone.
/// Absent or unrepresentable timestamps render as `unknown`.
pub fn format_expiry(timestamp: Option<i64>) -> String {
    match timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0).map(|_| ts)) {
        Some(ts) if ts > 0 => format!("<t:{}:F>", ts),
        _ => UNKNOWN_EXPIRY.to_string(),
    }
}

/// Human-readable UTC form for logs and dry runs.
pub fn expiry_utc(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| UNKNOWN_EXPIRY.to_string())
}

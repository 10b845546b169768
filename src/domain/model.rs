use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One free-game listing from the feed. `title` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub title: String,
    pub url: Option<String>,
    pub cover_image_url: Option<String>,
    pub offer_end_timestamp: Option<i64>,
}

impl Offer {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            cover_image_url: None,
            offer_end_timestamp: None,
        }
    }
}

/// Titles already announced, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    titles: Vec<String>,
    index: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains(title)
    }

    /// Returns false when the title was already present.
    pub fn insert(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        if self.index.contains(&title) {
            return false;
        }
        self.index.insert(title.clone());
        self.titles.push(title);
        true
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SeenSet::new();
        for title in iter {
            set.insert(title);
        }
        set
    }
}

/// Result of one feed fetch. Failures stay fail-open (no offers) but remain
/// distinguishable from a feed that simply has nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Offers(Vec<Offer>),
    NoOffers,
    Failed(String),
}

impl FetchOutcome {
    pub fn from_offers(offers: Vec<Offer>) -> Self {
        if offers.is_empty() {
            FetchOutcome::NoOffers
        } else {
            FetchOutcome::Offers(offers)
        }
    }

    pub fn offers(&self) -> &[Offer] {
        match self {
            FetchOutcome::Offers(offers) => offers,
            FetchOutcome::NoOffers | FetchOutcome::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    pub fn status(&self) -> FetchStatus {
        match self {
            FetchOutcome::Offers(offers) => FetchStatus::Fetched(offers.len()),
            FetchOutcome::NoOffers => FetchStatus::Empty,
            FetchOutcome::Failed(reason) => FetchStatus::Failed(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Fetched(usize),
    Empty,
    Failed(String),
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Fetched(n) => write!(f, "fetched {} offers", n),
            FetchStatus::Empty => write!(f, "feed had no offers"),
            FetchStatus::Failed(reason) => write!(f, "fetch failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub title: String,
    pub reason: String,
}

/// What one announce cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetch: FetchStatus,
    pub candidates: usize,
    pub announced: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
    pub persisted: bool,
    pub persist_error: Option<String>,
    pub interrupted: bool,
}

impl CycleReport {
    pub fn new(fetch: FetchStatus) -> Self {
        Self {
            fetch,
            candidates: 0,
            announced: Vec::new(),
            failed: Vec::new(),
            persisted: false,
            persist_error: None,
            interrupted: false,
        }
    }

    pub fn fetch_failed(&self) -> bool {
        matches!(self.fetch, FetchStatus::Failed(_))
    }

    /// Nothing was new: no announcements and no attempted deliveries.
    pub fn nothing_new(&self) -> bool {
        self.candidates == 0
    }
}

/// Discord channel id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message read back from the channel, used by the command listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub author_is_bot: bool,
}

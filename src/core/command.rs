use crate::core::cycle::AnnounceCycle;
use crate::domain::model::{ChannelId, ChatMessage};
use crate::domain::ports::CommandInbox;
use crate::utils::error::{BotError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const COMMAND_NAME: &str = "freegames";
pub const DEFAULT_PREFIX: &str = "!";

pub const ACK_MESSAGE: &str = "🔍 Checking for new free games...";
pub const NOTHING_NEW_MESSAGE: &str = "✅ All free games have already been announced!";
pub const BUSY_MESSAGE: &str = "⏳ A check is already running, try again in a moment.";
pub const FEED_DOWN_MESSAGE: &str = "⚠️ The free games feed is unavailable right now.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Announced(usize),
    NothingNew,
    FeedUnavailable,
    Busy,
}

/// Manual trigger for one announce cycle.
pub struct CommandSurface {
    cycle: Arc<AnnounceCycle>,
    prefix: String,
}

impl CommandSurface {
    pub fn new(cycle: Arc<AnnounceCycle>, prefix: impl Into<String>) -> Self {
        Self {
            cycle,
            prefix: prefix.into(),
        }
    }

    /// True when the first word of `content` is `<prefix>freegames`.
    /// Anything after the command word is ignored.
    pub fn is_command(&self, content: &str) -> bool {
        content
            .split_whitespace()
            .next()
            .and_then(|word| word.strip_prefix(self.prefix.as_str()))
            .is_some_and(|name| name == COMMAND_NAME)
    }

    /// Acknowledges, runs a cycle unless one is already running, and reports
    /// back when there was nothing to announce.
    pub async fn handle(&self, reply_to: &ChannelId) -> Result<CommandOutcome> {
        let notifier = &self.cycle.context().notifier;
        notifier.send_text(reply_to, ACK_MESSAGE).await?;

        let outcome = match self.cycle.try_run().await {
            Err(BotError::Busy) => {
                tracing::info!("Manual check rejected, a cycle is already running");
                notifier.send_text(reply_to, BUSY_MESSAGE).await?;
                return Ok(CommandOutcome::Busy);
            }
            Err(e) => return Err(e),
            Ok(report) if report.fetch_failed() => CommandOutcome::FeedUnavailable,
            Ok(report) if report.nothing_new() => CommandOutcome::NothingNew,
            Ok(report) => CommandOutcome::Announced(report.announced.len()),
        };

        match outcome {
            CommandOutcome::FeedUnavailable => {
                notifier.send_text(reply_to, FEED_DOWN_MESSAGE).await?
            }
            CommandOutcome::NothingNew => {
                notifier.send_text(reply_to, NOTHING_NEW_MESSAGE).await?
            }
            _ => {}
        }
        tracing::info!(outcome = ?outcome, "Manual check finished");
        Ok(outcome)
    }
}

/// Polls the channel for command messages and hands them to the surface.
pub struct CommandListener {
    surface: CommandSurface,
    inbox: Arc<dyn CommandInbox>,
    channel: ChannelId,
    poll_every: Duration,
    shutdown: watch::Receiver<bool>,
    cursor: Option<String>,
}

impl CommandListener {
    pub fn new(
        surface: CommandSurface,
        inbox: Arc<dyn CommandInbox>,
        channel: ChannelId,
        poll_every: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            surface,
            inbox,
            channel,
            poll_every,
            shutdown,
            cursor: None,
        }
    }

    pub async fn run(&mut self) {
        let mut shutdown = self.shutdown.clone();
        tracing::info!(
            channel = %self.channel,
            every = ?self.poll_every,
            "Listening for {}{} commands",
            self.surface.prefix,
            COMMAND_NAME
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = self.poll_once().await {
                tracing::warn!(error = %e, "Command poll failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_every) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Command listener stopped");
    }

    /// One poll. The first call only primes the cursor so older messages are
    /// never treated as fresh commands. Returns the number of commands handled.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let Some(cursor) = self.cursor.clone() else {
            let latest = self.inbox.messages_after(&self.channel, None).await?;
            self.cursor = Some(
                latest
                    .last()
                    .map(|m| m.id.clone())
                    .unwrap_or_else(|| "0".to_string()),
            );
            return Ok(0);
        };

        let messages = self.inbox.messages_after(&self.channel, Some(&cursor)).await?;
        let mut handled = 0;
        for message in messages {
            self.cursor = Some(message.id.clone());
            if !self.wants(&message) {
                continue;
            }
            tracing::info!(message_id = %message.id, "Manual check requested");
            match self.surface.handle(&self.channel).await {
                Ok(_) => handled += 1,
                Err(e) => tracing::warn!(error = %e, "Manual check could not reply"),
            }
        }
        Ok(handled)
    }

    fn wants(&self, message: &ChatMessage) -> bool {
        !message.author_is_bot && self.surface.is_command(&message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::AppContext;
    use crate::domain::model::{FetchOutcome, Offer, SeenSet};
    use crate::domain::ports::{Notifier, OfferFeed, SeenStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticFeed(FetchOutcome);

    #[async_trait]
    impl OfferFeed for StaticFeed {
        async fn fetch_offers(&self) -> FetchOutcome {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct MemoryStore(tokio::sync::Mutex<SeenSet>);

    #[async_trait]
    impl SeenStore for MemoryStore {
        async fn load(&self) -> SeenSet {
            self.0.lock().await.clone()
        }

        async fn save(&self, seen: &SeenSet) -> Result<()> {
            *self.0.lock().await = seen.clone();
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn ready(&self, _channel: &ChannelId) -> Result<()> {
            Ok(())
        }

        async fn announce(&self, _channel: &ChannelId, offer: &Offer) -> Result<()> {
            self.sent.lock().unwrap().push(format!("embed:{}", offer.title));
            Ok(())
        }

        async fn send_text(&self, _channel: &ChannelId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct ScriptedInbox {
        pages: Mutex<Vec<Vec<ChatMessage>>>,
        requested_after: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl CommandInbox for ScriptedInbox {
        async fn messages_after(
            &self,
            _channel: &ChannelId,
            after: Option<&str>,
        ) -> Result<Vec<ChatMessage>> {
            self.requested_after.lock().unwrap().push(after.map(str::to_string));
            let mut pages = self.pages.lock().unwrap();
            Ok(if pages.is_empty() { Vec::new() } else { pages.remove(0) })
        }
    }

    fn message(id: &str, content: &str, bot: bool) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            content: content.to_string(),
            author_is_bot: bot,
        }
    }

    fn surface(feed: FetchOutcome) -> (CommandSurface, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = AppContext::new(
            Arc::new(StaticFeed(feed)),
            Arc::new(MemoryStore::default()),
            notifier.clone(),
            ChannelId::new("42"),
        );
        (CommandSurface::new(Arc::new(AnnounceCycle::new(ctx)), DEFAULT_PREFIX), notifier)
    }

    #[test]
    fn test_is_command() {
        let (surface, _) = surface(FetchOutcome::NoOffers);

        assert!(surface.is_command("!freegames"));
        assert!(surface.is_command("  !freegames  "));
        assert!(surface.is_command("!freegames please"));
        assert!(!surface.is_command("!freegamesx"));
        assert!(!surface.is_command("freegames"));
        assert!(!surface.is_command("?freegames"));
        assert!(!surface.is_command(""));
    }

    #[test]
    fn test_custom_prefix() {
        let (surface, _) = surface(FetchOutcome::NoOffers);
        let surface = CommandSurface::new(surface.cycle.clone(), "$$");
        assert!(surface.is_command("$$freegames"));
        assert!(!surface.is_command("!freegames"));
    }

    #[tokio::test]
    async fn test_handle_announces_after_ack() {
        let (surface, notifier) = surface(FetchOutcome::from_offers(vec![Offer::titled("Hades")]));

        let outcome = surface.handle(&ChannelId::new("42")).await.unwrap();

        assert_eq!(outcome, CommandOutcome::Announced(1));
        assert_eq!(notifier.sent(), vec![ACK_MESSAGE.to_string(), "embed:Hades".to_string()]);
    }

    #[tokio::test]
    async fn test_handle_reports_nothing_new() {
        let (surface, notifier) = surface(FetchOutcome::from_offers(vec![Offer::titled("Hades")]));
        surface.handle(&ChannelId::new("42")).await.unwrap();

        let outcome = surface.handle(&ChannelId::new("42")).await.unwrap();

        assert_eq!(outcome, CommandOutcome::NothingNew);
        assert_eq!(notifier.sent().last().unwrap(), NOTHING_NEW_MESSAGE);
    }

    #[tokio::test]
    async fn test_handle_reports_feed_failure() {
        let (surface, notifier) = surface(FetchOutcome::Failed("HTTP 502".to_string()));

        let outcome = surface.handle(&ChannelId::new("42")).await.unwrap();

        assert_eq!(outcome, CommandOutcome::FeedUnavailable);
        assert_eq!(notifier.sent(), vec![ACK_MESSAGE, FEED_DOWN_MESSAGE]);
    }

    struct GatedFeed {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl OfferFeed for GatedFeed {
        async fn fetch_offers(&self) -> FetchOutcome {
            self.entered.notify_one();
            self.release.notified().await;
            FetchOutcome::NoOffers
        }
    }

    #[tokio::test]
    async fn test_handle_replies_busy_while_cycle_runs() {
        let feed = Arc::new(GatedFeed {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = AppContext::new(
            feed.clone(),
            Arc::new(MemoryStore::default()),
            notifier.clone(),
            ChannelId::new("42"),
        );
        let cycle = Arc::new(AnnounceCycle::new(ctx));
        let surface = CommandSurface::new(cycle.clone(), DEFAULT_PREFIX);

        let running = tokio::spawn(async move { cycle.run().await });
        feed.entered.notified().await;

        let outcome = surface.handle(&ChannelId::new("42")).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Busy);
        assert_eq!(notifier.sent(), vec![ACK_MESSAGE, BUSY_MESSAGE]);

        feed.release.notify_one();
        running.await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_primes_cursor_then_handles_user_commands_only() {
        let (surface, notifier) = surface(FetchOutcome::from_offers(vec![Offer::titled("Hades")]));
        let inbox = Arc::new(ScriptedInbox {
            pages: Mutex::new(vec![
                vec![message("100", "!freegames", false)],
                vec![
                    message("101", "hello", false),
                    message("102", "!freegames", true),
                    message("103", "!freegames", false),
                ],
            ]),
            requested_after: Mutex::new(Vec::new()),
        });
        let (_tx, rx) = watch::channel(false);
        let mut listener = CommandListener::new(
            surface,
            inbox.clone(),
            ChannelId::new("42"),
            Duration::from_secs(5),
            rx,
        );

        assert_eq!(listener.poll_once().await.unwrap(), 0);
        assert_eq!(listener.poll_once().await.unwrap(), 1);
        assert_eq!(listener.poll_once().await.unwrap(), 0);

        assert_eq!(
            *inbox.requested_after.lock().unwrap(),
            vec![None, Some("100".to_string()), Some("103".to_string())]
        );
        assert_eq!(notifier.sent(), vec![ACK_MESSAGE.to_string(), "embed:Hades".to_string()]);
    }
}

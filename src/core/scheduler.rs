use crate::core::cycle::AnnounceCycle;
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_READY_RETRY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    WaitingForChannelReady,
    Running,
    Sleeping,
    Stopped,
}

/// Runs a cycle as soon as the channel is reachable, then on a fixed interval
/// until the shutdown flag is set.
pub struct Scheduler {
    cycle: Arc<AnnounceCycle>,
    period: Duration,
    ready_retry: Duration,
    shutdown: watch::Receiver<bool>,
    state: SchedulerState,
    completed: u64,
}

impl Scheduler {
    pub fn new(
        cycle: Arc<AnnounceCycle>,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cycle,
            period,
            ready_retry: DEFAULT_READY_RETRY,
            shutdown,
            state: SchedulerState::Idle,
            completed: 0,
        }
    }

    pub fn with_ready_retry(mut self, ready_retry: Duration) -> Self {
        self.ready_retry = ready_retry;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::debug!(from = ?self.state, to = ?next, "Scheduler state change");
        self.state = next;
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Returns when shutdown is requested, or with an error if the channel can
    /// never be used (bad token, unknown channel).
    pub async fn run(&mut self) -> Result<()> {
        self.transition(SchedulerState::WaitingForChannelReady);
        if !self.wait_for_channel().await? {
            self.transition(SchedulerState::Stopped);
            return Ok(());
        }

        tracing::info!(every = ?self.period, "Scheduler started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.transition(SchedulerState::Running);
                    let report = self.cycle.run().await;
                    self.completed += 1;
                    tracing::info!(
                        cycle = self.completed,
                        fetch = %report.fetch,
                        announced = report.announced.len(),
                        failed = report.failed.len(),
                        "Scheduled check finished"
                    );
                    if let Some(warning) = &report.persist_error {
                        tracing::warn!(
                            warning = %warning,
                            "Scheduled check could not save seen games"
                        );
                    }
                    if self.stopping() {
                        break;
                    }
                    self.transition(SchedulerState::Sleeping);
                }
                changed = shutdown.changed() => {
                    // a dropped sender counts as shutdown
                    if changed.is_err() || self.stopping() {
                        break;
                    }
                }
            }
        }

        self.transition(SchedulerState::Stopped);
        tracing::info!(cycles = self.completed, "Scheduler stopped");
        Ok(())
    }

    /// `Ok(false)` when shutdown arrived before the channel became ready.
    async fn wait_for_channel(&mut self) -> Result<bool> {
        let mut shutdown = self.shutdown.clone();
        loop {
            if self.stopping() {
                return Ok(false);
            }
            match self.cycle.channel_ready().await {
                Ok(()) => {
                    tracing::info!(channel = %self.cycle.context().channel, "Channel ready");
                    return Ok(true);
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Channel cannot be used");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in = ?self.ready_retry,
                        "Channel not ready yet"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.ready_retry) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::AppContext;
    use crate::domain::model::{ChannelId, FetchOutcome, Offer, SeenSet};
    use crate::domain::ports::{Notifier, OfferFeed, SeenStore};
    use crate::utils::error::BotError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFeed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OfferFeed for CountingFeed {
        async fn fetch_offers(&self) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FetchOutcome::NoOffers
        }
    }

    struct NullStore;

    #[async_trait]
    impl SeenStore for NullStore {
        async fn load(&self) -> SeenSet {
            SeenSet::new()
        }

        async fn save(&self, _seen: &SeenSet) -> Result<()> {
            Ok(())
        }
    }

    struct FlakyNotifier {
        not_ready_for: AtomicUsize,
        fatal: bool,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn ready(&self, _channel: &ChannelId) -> Result<()> {
            if self.fatal {
                return Err(BotError::config("Discord rejected the bot token"));
            }
            if self.not_ready_for.load(Ordering::SeqCst) > 0 {
                self.not_ready_for.fetch_sub(1, Ordering::SeqCst);
                return Err(BotError::DeliveryError {
                    status: Some(502),
                    message: "bad gateway".to_string(),
                });
            }
            Ok(())
        }

        async fn announce(&self, _channel: &ChannelId, _offer: &Offer) -> Result<()> {
            Ok(())
        }

        async fn send_text(&self, _channel: &ChannelId, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn setup(not_ready_for: usize, fatal: bool) -> (Arc<CountingFeed>, Arc<AnnounceCycle>) {
        let feed = Arc::new(CountingFeed {
            calls: AtomicUsize::new(0),
        });
        let notifier = Arc::new(FlakyNotifier {
            not_ready_for: AtomicUsize::new(not_ready_for),
            fatal,
        });
        let ctx = AppContext::new(
            feed.clone(),
            Arc::new(NullStore),
            notifier,
            ChannelId::new("42"),
        );
        (feed, Arc::new(AnnounceCycle::new(ctx)))
    }

    #[tokio::test]
    async fn test_runs_immediately_then_on_interval_until_shutdown() {
        let (feed, cycle) = setup(0, false);
        let (tx, rx) = watch::channel(false);
        let mut scheduler = Scheduler::new(cycle, Duration::from_millis(40), rx);

        let handle = tokio::spawn(async move {
            scheduler.run().await.unwrap();
            scheduler
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        tx.send(true).unwrap();
        let scheduler = handle.await.unwrap();

        assert!(feed.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.completed_cycles() as usize, feed.calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_waits_for_channel_before_first_cycle() {
        let (feed, cycle) = setup(2, false);
        let (tx, rx) = watch::channel(false);
        let mut scheduler = Scheduler::new(cycle, Duration::from_secs(3600), rx)
            .with_ready_retry(Duration::from_millis(10));

        let handle = tokio::spawn(async move { scheduler.run().await });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_fatal_channel_error_stops_scheduler() {
        let (feed, cycle) = setup(0, true);
        let (_tx, rx) = watch::channel(false);
        let mut scheduler = Scheduler::new(cycle, Duration::from_secs(3600), rx);

        let err = scheduler.run().await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_ready_never_runs_a_cycle() {
        let (feed, cycle) = setup(usize::MAX, false);
        let (tx, rx) = watch::channel(false);
        let mut scheduler = Scheduler::new(cycle, Duration::from_secs(3600), rx)
            .with_ready_retry(Duration::from_secs(3600));

        let handle = tokio::spawn(async move {
            scheduler.run().await.unwrap();
            scheduler.state()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), SchedulerState::Stopped);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }
}

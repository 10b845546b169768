use crate::core::context::AppContext;
use crate::domain::model::{CycleReport, DeliveryFailure, FetchOutcome, Offer, SeenSet};
use crate::utils::error::{BotError, Result};
use std::collections::HashSet;
use tokio::sync::{watch, Mutex};

/// One fetch → filter → announce → persist pass. At most one pass runs at a
/// time per `AnnounceCycle`.
pub struct AnnounceCycle {
    ctx: AppContext,
    guard: Mutex<()>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl AnnounceCycle {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            guard: Mutex::new(()),
            shutdown: None,
        }
    }

    /// Stop between offers once the flag turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub async fn channel_ready(&self) -> Result<()> {
        self.ctx.notifier.ready(&self.ctx.channel).await
    }

    /// Waits for any running cycle to finish, then runs.
    pub async fn run(&self) -> CycleReport {
        let _guard = self.guard.lock().await;
        self.run_exclusive().await
    }

    /// Runs only if no other cycle is in progress.
    pub async fn try_run(&self) -> Result<CycleReport> {
        let _guard = self.guard.try_lock().map_err(|_| BotError::Busy)?;
        Ok(self.run_exclusive().await)
    }

    /// Offers that a cycle would announce right now, without side effects.
    pub async fn preview(&self) -> (FetchOutcome, Vec<Offer>) {
        let _guard = self.guard.lock().await;
        let seen = self.ctx.store.load().await;
        let outcome = self.ctx.feed.fetch_offers().await;
        let fresh = filter_new(outcome.offers(), &seen);
        (outcome, fresh)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn run_exclusive(&self) -> CycleReport {
        let mut seen = self.ctx.store.load().await;
        let outcome = self.ctx.feed.fetch_offers().await;
        let mut report = CycleReport::new(outcome.status());

        if let FetchOutcome::Failed(reason) = &outcome {
            tracing::warn!(reason = %reason, "Feed unavailable, skipping cycle");
            return report;
        }

        let fresh = filter_new(outcome.offers(), &seen);
        report.candidates = fresh.len();
        if fresh.is_empty() {
            tracing::info!(seen = seen.len(), "No new free games to announce");
            return report;
        }

        tracing::info!(new = fresh.len(), "Announcing new free games");
        for offer in &fresh {
            if self.shutdown_requested() {
                tracing::info!(
                    remaining = fresh.len() - report.announced.len() - report.failed.len(),
                    "Shutdown requested, stopping cycle early"
                );
                report.interrupted = true;
                break;
            }

            match self.ctx.notifier.announce(&self.ctx.channel, offer).await {
                Ok(()) => {
                    tracing::info!(title = %offer.title, "Announced free game");
                    seen.insert(offer.title.clone());
                    report.announced.push(offer.title.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        title = %offer.title,
                        error = %e,
                        "Failed to announce free game"
                    );
                    report.failed.push(DeliveryFailure {
                        title: offer.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.announced.is_empty() {
            return report;
        }

        match self.ctx.store.save(&seen).await {
            Ok(()) => report.persisted = true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    suggestion = e.recovery_suggestion(),
                    "Announced games could not be recorded; they may be announced again"
                );
                report.persist_error = Some(e.to_string());
            }
        }
        report
    }
}

/// Offers whose title is not in `seen`, in feed order, each title at most once.
pub fn filter_new(offers: &[Offer], seen: &SeenSet) -> Vec<Offer> {
    let mut batch: HashSet<&str> = HashSet::new();
    offers
        .iter()
        .filter(|offer| !seen.contains(&offer.title) && batch.insert(offer.title.as_str()))
        .cloned()
        .collect()
}

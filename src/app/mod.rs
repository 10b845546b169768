//! Builds the running bot from a validated [`BotConfig`].

use crate::adapters::discord::{DiscordClient, DiscordNotifier};
use crate::adapters::feed::HttpOfferFeed;
use crate::adapters::store::JsonFileSeenStore;
use crate::config::BotConfig;
use crate::core::command::{CommandListener, CommandSurface};
use crate::core::context::AppContext;
use crate::core::cycle::AnnounceCycle;
use crate::core::scheduler::Scheduler;
use crate::domain::model::ChannelId;
use crate::utils::error::{BotError, Result};
use std::sync::Arc;
use tokio::sync::watch;

pub struct App {
    config: BotConfig,
    cycle: Arc<AnnounceCycle>,
    discord: Arc<DiscordClient>,
    shutdown_tx: watch::Sender<bool>,
}

impl App {
    pub fn build(config: BotConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let discord = Arc::new(DiscordClient::new(
            config.discord_api_base.clone(),
            config.discord_token.clone(),
            timeout,
        )?);
        let feed = HttpOfferFeed::new(config.feed_url.clone(), config.feed_key.clone(), timeout)?;
        let store = JsonFileSeenStore::new(&config.state_path);
        let notifier = DiscordNotifier::new(discord.as_ref().clone(), config.footer.clone());

        let ctx = AppContext::new(
            Arc::new(feed),
            Arc::new(store),
            Arc::new(notifier),
            ChannelId::new(config.channel_id.clone()),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let cycle = Arc::new(AnnounceCycle::new(ctx).with_shutdown(shutdown_rx));

        Ok(Self {
            config,
            cycle,
            discord,
            shutdown_tx,
        })
    }

    pub fn cycle(&self) -> Arc<AnnounceCycle> {
        self.cycle.clone()
    }

    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.cycle.clone(),
            self.config.poll_interval(),
            self.shutdown_tx.subscribe(),
        )
    }

    pub fn command_listener(&self) -> Option<CommandListener> {
        if !self.config.commands_enabled {
            return None;
        }
        let surface = CommandSurface::new(self.cycle.clone(), self.config.command_prefix.clone());
        Some(CommandListener::new(
            surface,
            self.discord.clone(),
            self.cycle.context().channel.clone(),
            self.config.command_poll_interval(),
            self.shutdown_tx.subscribe(),
        ))
    }

    /// Runs the scheduler and (if enabled) the command listener until
    /// `shutdown` resolves. A fatal scheduler error ends the run early.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let mut scheduler = self.scheduler();
        let listener = self.command_listener().map(|mut listener| {
            tokio::spawn(async move { listener.run().await })
        });
        let mut scheduler_task = tokio::spawn(async move { scheduler.run().await });

        let result = tokio::select! {
            joined = &mut scheduler_task => flatten(joined),
            _ = shutdown => {
                tracing::info!("Shutdown requested, finishing current work");
                let _ = self.shutdown_tx.send(true);
                flatten(scheduler_task.await)
            }
        };

        // make sure the listener also stops when the scheduler ended on its own
        let _ = self.shutdown_tx.send(true);
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        result
    }
}

/// Resolves on SIGINT or SIGTERM. The handlers are installed when this is
/// called, so a signal that lands before the future is polled still counts.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let install = |kind: SignalKind| {
        signal(kind).map_err(|e| BotError::TaskError {
            message: format!("cannot install signal handler: {}", e),
        })
    };
    let mut interrupt = install(SignalKind::interrupt())?;
    let mut terminate = install(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::info!("Received SIGINT"),
            _ = terminate.recv() => tracing::info!("Received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(BotError::TaskError {
            message: format!("scheduler: {}", e),
        }),
    }
}

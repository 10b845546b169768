use crate::domain::model::ChannelId;
use crate::domain::ports::{Notifier, OfferFeed, SeenStore};
use std::sync::Arc;

/// Collaborators shared by the cycle, the scheduler and the command surface.
#[derive(Clone)]
pub struct AppContext {
    pub feed: Arc<dyn OfferFeed>,
    pub store: Arc<dyn SeenStore>,
    pub notifier: Arc<dyn Notifier>,
    pub channel: ChannelId,
}

impl AppContext {
    pub fn new(
        feed: Arc<dyn OfferFeed>,
        store: Arc<dyn SeenStore>,
        notifier: Arc<dyn Notifier>,
        channel: ChannelId,
    ) -> Self {
        Self {
            feed,
            store,
            notifier,
            channel,
        }
    }
}

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::app::App;
pub use crate::config::BotConfig;
pub use crate::core::{command::CommandSurface, cycle::AnnounceCycle, scheduler::Scheduler};
pub use crate::domain::model::{CycleReport, FetchOutcome, Offer, SeenSet};
pub use crate::utils::error::{BotError, Result};

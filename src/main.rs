use anyhow::Context;
use clap::Parser;
use free_games_notifier::config::toml_config::TomlConfig;
use free_games_notifier::config::{Cli, Command, LogFormat};
use free_games_notifier::core::render::expiry_utc;
use free_games_notifier::utils::error::ErrorSeverity;
use free_games_notifier::utils::{logger, validation::Validate};
use free_games_notifier::app::shutdown_signal;
use free_games_notifier::{App, BotConfig, BotError, CycleReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting free-games-notifier");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let app = match App::build(config) {
        Ok(app) => app,
        Err(e) => exit_with(&e),
    };

    match cli.command() {
        Command::Run => {
            let shutdown = shutdown_signal().context("installing shutdown signal handlers")?;
            if let Err(e) = app.run_until(shutdown).await {
                exit_with(&e);
            }
            tracing::info!("Bye");
        }
        Command::Check { dry_run: true } => {
            let (outcome, fresh) = app.cycle().preview().await;
            println!("Feed: {}", outcome.status());
            if fresh.is_empty() {
                println!("Nothing new to announce");
            }
            for offer in &fresh {
                println!(
                    "would announce: {} (ends {})",
                    offer.title,
                    expiry_utc(offer.offer_end_timestamp)
                );
            }
        }
        Command::Check { dry_run: false } => {
            let cycle = app.cycle();
            if let Err(e) = cycle.channel_ready().await {
                exit_with(&e);
            }
            let report = cycle.run().await;
            print_report(&report);
            if report.fetch_failed() || report.persist_error.is_some() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> free_games_notifier::Result<BotConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            TomlConfig::from_file(path)?.into_bot_config()
        }
        None => BotConfig::from_env()?,
    };

    if let Some(minutes) = cli.interval_minutes {
        tracing::info!("🔧 Poll interval overridden to {} minutes", minutes);
        config.interval_minutes = minutes;
    }
    if let Some(path) = &cli.state_path {
        tracing::info!("🔧 State path overridden to {}", path);
        config.state_path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &CycleReport) {
    println!("Feed: {}", report.fetch);
    for title in &report.announced {
        println!("announced: {}", title);
    }
    for failure in &report.failed {
        println!("failed: {} ({})", failure.title, failure.reason);
    }
    if report.nothing_new() && !report.fetch_failed() {
        println!("Nothing new to announce");
    }
    if let Some(warning) = &report.persist_error {
        println!("warning: seen games not saved: {}", warning);
    }
}

fn exit_with(e: &BotError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

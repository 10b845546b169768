use free_games_notifier::{App, BotConfig, BotError};
use httpmock::prelude::*;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

fn config(feed: &MockServer, discord: &MockServer, state_path: &str, commands: bool) -> BotConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DISCORD_TOKEN", "app-token".to_string()),
        ("DISCORD_CHANNEL_ID", "42".to_string()),
        ("DISCORD_API_BASE", discord.base_url()),
        ("FEED_URL", feed.url("/free-games")),
        ("SEEN_STATE_PATH", state_path.to_string()),
        ("COMMANDS_ENABLED", commands.to_string()),
        ("COMMAND_POLL_SECONDS", "1".to_string()),
    ]);
    BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn test_app_runs_first_cycle_after_channel_ready() {
    let temp_dir = TempDir::new().unwrap();
    let state_path = temp_dir.path().join("sent_games.json");

    let feed = MockServer::start();
    feed.mock(|when, then| {
        when.method(GET).path("/free-games");
        then.status(200)
            .json_body(serde_json::json!({"epic": [{"title": "Hades"}]}));
    });

    let discord = MockServer::start();
    let ready = discord.mock(|when, then| {
        when.method(GET)
            .path("/channels/42")
            .header("Authorization", "Bot app-token");
        then.status(200).json_body(serde_json::json!({"id": "42"}));
    });
    let history = discord.mock(|when, then| {
        when.method(GET).path("/channels/42/messages");
        then.status(200).json_body(serde_json::json!([]));
    });
    let posts = discord.mock(|when, then| {
        when.method(POST).path("/channels/42/messages");
        then.status(200).json_body(serde_json::json!({"id": "1"}));
    });

    let app = App::build(config(&feed, &discord, state_path.to_str().unwrap(), true)).unwrap();
    app.run_until(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    ready.assert();
    assert!(history.hits() >= 1);
    posts.assert_hits(1);
    let saved: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved, vec!["Hades"]);
}

#[tokio::test]
async fn test_app_stops_on_unknown_channel() {
    let temp_dir = TempDir::new().unwrap();
    let state_path = temp_dir.path().join("sent_games.json");

    let feed = MockServer::start();
    let feed_mock = feed.mock(|when, then| {
        when.method(GET).path("/free-games");
        then.status(200).json_body(serde_json::json!({"epic": []}));
    });
    let discord = MockServer::start();
    discord.mock(|when, then| {
        when.method(GET).path("/channels/42");
        then.status(404);
    });

    let app = App::build(config(&feed, &discord, state_path.to_str().unwrap(), false)).unwrap();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        app.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("scheduler should stop on its own");

    assert!(matches!(result, Err(BotError::InvalidConfigValueError { .. })));
    assert_eq!(feed_mock.hits(), 0);
    assert!(!state_path.exists());
}

//! nvrbot - NVR-to-Telegram Notification Bridge
//!
//! Main entry point: wires the poller, notifier and command handler.

use nvrbot::{
    chat_state::StateStore,
    command_handler::CommandHandler,
    event_poller::EventPoller,
    event_source::FrigateClient,
    notifier::Notifier,
    state::{AppConfig, AppState},
    telegram::TelegramClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Load configuration first; the debug flag picks the default log filter
    let config = AppConfig::default();

    let default_filter = if config.debug { "nvrbot=debug" } else { "nvrbot=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nvrbot v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;
    tracing::info!(
        frigate_url = %config.frigate_url,
        chat_id = config.telegram_chat_id,
        poll_interval_secs = config.poll_interval_secs,
        send_text_event = config.send_text_event,
        state_file = %config.state_file.display(),
        "Configuration loaded"
    );

    // Validate the bot credential; there is no degraded mode without Telegram
    let telegram = Arc::new(TelegramClient::new(&config.telegram_bot_token)?);
    let me = telegram.get_me().await?;
    tracing::info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or("<unset>"),
        "Authorized on bot account"
    );

    let store = Arc::new(StateStore::load(config.state_file.clone()));
    tracing::info!(chats = store.count().await, "StateStore loaded");

    // Primary chat exists in the store from the first cycle onward
    store.get(config.telegram_chat_id).await;

    let frigate = Arc::new(FrigateClient::new(config.frigate_url.clone())?);
    if !frigate.health_check().await {
        tracing::warn!(frigate_url = %config.frigate_url, "Frigate not reachable at startup");
    }

    let poller = Arc::new(EventPoller::new());
    let notifier = Arc::new(Notifier::new(store.clone()));

    let state = AppState {
        config: config.clone(),
        store: store.clone(),
        frigate: frigate.clone(),
        telegram: telegram.clone(),
        poller: poller.clone(),
        notifier: notifier.clone(),
    };

    // Startup message to the primary chat; failure here is not fatal
    let startup_msg = format!("Starting nvrbot.\nFrigate URL: {}", config.frigate_url);
    if let Err(e) = telegram
        .send_message(config.telegram_chat_id, &startup_msg, false, None)
        .await
    {
        tracing::error!(error = %e, "Failed to send startup message");
    }

    // Command handler task (update long-poll)
    let handler = CommandHandler::new(store.clone(), telegram.clone());
    tokio::spawn(async move { handler.run().await });

    // Streaming notification task for in-progress events
    if config.send_text_event {
        let stream_state = state.clone();
        tokio::spawn(async move {
            stream_state
                .notifier
                .run_ongoing_stream(&stream_state.frigate, &*stream_state.telegram, 10)
                .await
        });
    }

    // Main poll loop: fetch -> deliver -> mark seen
    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    tracing::info!("Poll loop started");

    loop {
        interval.tick().await;

        let events = poller.fetch_new(&frigate).await;
        if events.is_empty() {
            tracing::debug!("Poll cycle produced no new events");
            continue;
        }

        let chat_ids = store.known_chats().await;
        let sent = notifier.deliver(&*telegram, &events, &chat_ids).await;
        tracing::info!(events = events.len(), sent = sent, "Poll cycle delivered");

        // Mark only after the whole batch was dispatched
        poller.mark_seen(events.into_iter().map(|e| e.id)).await;
    }
}

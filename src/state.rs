//! Application state
//!
//! Holds configuration and all shared components

use crate::chat_state::StateStore;
use crate::error::{Error, Result};
use crate::event_poller::EventPoller;
use crate::event_source::FrigateClient;
use crate::notifier::Notifier;
use crate::telegram::TelegramClient;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Frigate base URL
    pub frigate_url: String,
    /// Telegram bot token
    pub telegram_bot_token: String,
    /// Primary chat for event notifications
    pub telegram_chat_id: i64,
    /// Seconds between poll cycles
    pub poll_interval_secs: u64,
    /// Enable the streaming task for in-progress events
    pub send_text_event: bool,
    /// Debug flag (lowers the default log filter)
    pub debug: bool,
    /// Path of the persisted chat-state snapshot
    pub state_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frigate_url: std::env::var("FRIGATE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            poll_interval_secs: std::env::var("SLEEP_TIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            send_text_event: std::env::var("SEND_TEXT_EVENT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            debug: std::env::var("DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            state_file: std::env::var("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("bot_state.json")),
        }
    }
}

impl AppConfig {
    /// Reject configurations the process cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            return Err(Error::Config("TELEGRAM_BOT_TOKEN is not set".to_string()));
        }
        if self.telegram_chat_id == 0 {
            return Err(Error::Config("TELEGRAM_CHAT_ID is not set".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("SLEEP_TIME must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Application state shared across tasks
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// StateStore (per-chat preferences)
    pub store: Arc<StateStore>,
    /// FrigateClient (NVR adapter)
    pub frigate: Arc<FrigateClient>,
    /// TelegramClient (Bot API adapter)
    pub telegram: Arc<TelegramClient>,
    /// EventPoller (dedup engine)
    pub poller: Arc<EventPoller>,
    /// Notifier (delivery fan-out)
    pub notifier: Arc<Notifier>,
}

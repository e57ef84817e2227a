//! CommandHandler - Inbound Chat Commands
//!
//! ## Responsibilities
//!
//! - Parse /commands from inbound updates into a closed enum
//! - Apply the command table: state mutation + reply text
//! - Handle inline menu taps (reply only, acknowledged first, no mutation)
//! - Consume the update long-poll for the process lifetime
//!
//! Adding a command means adding an enum variant and a table row, not new
//! control flow.

use std::sync::Arc;
use std::time::Duration;

use crate::chat_state::StateStore;
use crate::telegram::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, TelegramClient, Update,
};

/// Delay before retrying a failed update fetch
const UPDATE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Known chat commands plus the unknown fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Mute,
    Unmute,
    Ping,
    Pong,
    Status,
    Help,
    Menu,
    Unknown,
}

impl Command {
    /// Parse a message text; `None` when the text is not a command at all
    pub fn parse(text: &str) -> Option<Command> {
        let first = text.split_whitespace().next()?;
        let cmd = first.strip_prefix('/')?;
        // "/start@mybot" addresses this bot explicitly
        let cmd = cmd.split('@').next().unwrap_or(cmd);

        Some(match cmd.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "mute" => Command::Mute,
            "unmute" => Command::Unmute,
            "ping" => Command::Ping,
            "pong" => Command::Pong,
            "status" => Command::Status,
            "help" => Command::Help,
            "menu" => Command::Menu,
            _ => Command::Unknown,
        })
    }
}

/// Reply produced by applying a command
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl CommandReply {
    fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            keyboard: None,
        }
    }
}

const HELP_TEXT: &str =
    "Available commands:\n/start, /stop, /mute, /unmute, /ping, /status, /menu";
const STATUS_TEXT: &str = "I'm ok.";
const UNKNOWN_TEXT: &str = "I don't know that command.";

fn menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::new("Ping", "cmd_ping"),
                InlineKeyboardButton::new("Status", "cmd_status"),
            ],
            vec![InlineKeyboardButton::new("Help", "cmd_help")],
        ],
    }
}

/// Apply a command for a chat: mutate state per the command table and build
/// the reply
///
/// A persistence failure is logged; the in-memory state stays authoritative
/// and the reply still goes out.
pub async fn apply(store: &StateStore, chat_id: i64, command: Command) -> CommandReply {
    let mutation: Option<(fn(&mut crate::chat_state::ChatPrefs), &str)> = match command {
        Command::Start => Some((|p| p.enabled = true, "Notifications enabled.")),
        Command::Stop => Some((|p| p.enabled = false, "Notifications disabled.")),
        Command::Mute => Some((|p| p.silent = true, "Notifications are now silent.")),
        Command::Unmute => Some((|p| p.silent = false, "Silent mode disabled.")),
        _ => None,
    };

    if let Some((mutate, reply)) = mutation {
        if let Err(e) = store.update(chat_id, mutate).await {
            tracing::error!(chat_id = chat_id, error = %e, "Failed to persist preference change");
        }
        tracing::info!(chat_id = chat_id, command = ?command, "Preference updated");
        return CommandReply::text(reply);
    }

    match command {
        Command::Ping => CommandReply::text("pong"),
        Command::Pong => CommandReply::text("ping"),
        Command::Status => CommandReply::text(STATUS_TEXT),
        Command::Help => CommandReply::text(HELP_TEXT),
        Command::Menu => CommandReply {
            text: "Select a command:".to_string(),
            keyboard: Some(menu_keyboard()),
        },
        Command::Unknown => CommandReply::text(UNKNOWN_TEXT),
        // Mutating commands already returned above
        _ => unreachable!("mutating commands handled in the table"),
    }
}

/// Reply text for an inline menu tap; never mutates state
pub fn callback_reply(data: &str) -> String {
    match data {
        "cmd_ping" => "pong".to_string(),
        "cmd_status" => STATUS_TEXT.to_string(),
        "cmd_help" => {
            "Available commands: /ping, /status, /pong, /menu, /start, /stop, /mute, /unmute"
                .to_string()
        }
        _ => "Unknown command".to_string(),
    }
}

/// CommandHandler instance
pub struct CommandHandler {
    store: Arc<StateStore>,
    telegram: Arc<TelegramClient>,
}

impl CommandHandler {
    /// Create new CommandHandler
    pub fn new(store: Arc<StateStore>, telegram: Arc<TelegramClient>) -> Self {
        Self { store, telegram }
    }

    /// Consume the update long-poll forever
    ///
    /// Fetch failures back off briefly and retry; a reply failure is logged
    /// and the loop continues.
    pub async fn run(&self) {
        tracing::info!("Command handler started");
        let mut offset = 0i64;

        loop {
            let updates = match self.telegram.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(error = %e, "Update fetch failed, retrying");
                    tokio::time::sleep(UPDATE_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(message).await;
        }
        if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await;
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = Command::parse(text) else {
            return;
        };

        let chat_id = message.chat.id;
        tracing::debug!(chat_id = chat_id, command = ?command, "Command received");

        let reply = apply(&self.store, chat_id, command).await;
        if let Err(e) = self
            .telegram
            .send_message(chat_id, &reply.text, false, reply.keyboard.as_ref())
            .await
        {
            tracing::error!(chat_id = chat_id, error = %e, "Failed to send command reply");
        }
    }

    async fn handle_callback(&self, callback: CallbackQuery) {
        // Acknowledge before replying, per the platform's interaction contract
        if let Err(e) = self.telegram.answer_callback(&callback.id).await {
            tracing::error!(callback_id = %callback.id, error = %e, "Failed to answer callback");
        }

        let Some(message) = callback.message else {
            return;
        };
        let reply = callback_reply(callback.data.as_deref().unwrap_or_default());

        if let Err(e) = self
            .telegram
            .send_message(message.chat.id, &reply, false, None)
            .await
        {
            tracing::error!(chat_id = message.chat.id, error = %e, "Failed to send callback reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/STOP"), Some(Command::Stop));
        assert_eq!(Command::parse("/mute@nvrbot"), Some(Command::Mute));
        assert_eq!(Command::parse("/menu extra args"), Some(Command::Menu));
    }

    #[test]
    fn test_parse_unknown_and_non_commands() {
        assert_eq!(Command::parse("/frobnicate"), Some(Command::Unknown));
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn test_start_stop_toggle_enabled() {
        let (_dir, store) = store();

        let reply = apply(&store, 42, Command::Stop).await;
        assert_eq!(reply.text, "Notifications disabled.");
        assert!(!store.get(42).await.enabled);

        let reply = apply(&store, 42, Command::Start).await;
        assert_eq!(reply.text, "Notifications enabled.");
        assert!(store.get(42).await.enabled);
    }

    #[tokio::test]
    async fn test_mute_unmute_toggle_silent() {
        let (_dir, store) = store();

        apply(&store, 1, Command::Mute).await;
        assert!(store.get(1).await.silent);

        apply(&store, 1, Command::Unmute).await;
        assert!(!store.get(1).await.silent);
    }

    #[tokio::test]
    async fn test_ping_pong_swapped() {
        let (_dir, store) = store();
        assert_eq!(apply(&store, 1, Command::Ping).await.text, "pong");
        assert_eq!(apply(&store, 1, Command::Pong).await.text, "ping");
    }

    #[tokio::test]
    async fn test_read_only_commands_do_not_mutate() {
        let (_dir, store) = store();
        store.update(5, |p| p.enabled = false).await.unwrap();

        apply(&store, 5, Command::Ping).await;
        apply(&store, 5, Command::Status).await;
        apply(&store, 5, Command::Help).await;
        apply(&store, 5, Command::Menu).await;
        apply(&store, 5, Command::Unknown).await;

        assert!(!store.get(5).await.enabled);
    }

    #[tokio::test]
    async fn test_menu_carries_keyboard() {
        let (_dir, store) = store();
        let reply = apply(&store, 1, Command::Menu).await;
        let keyboard = reply.keyboard.expect("menu reply has keyboard");
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);
    }

    #[test]
    fn test_callback_replies() {
        assert_eq!(callback_reply("cmd_ping"), "pong");
        assert_eq!(callback_reply("cmd_status"), "I'm ok.");
        assert!(callback_reply("cmd_help").contains("/mute"));
        assert_eq!(callback_reply("bogus"), "Unknown command");
    }
}

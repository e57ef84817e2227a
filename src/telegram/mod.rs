//! TelegramClient - Bot API Adapter
//!
//! ## Responsibilities
//!
//! - Send messages (with silent delivery and inline keyboards)
//! - Long-poll inbound updates (commands, callback queries)
//! - Acknowledge callback queries
//! - Validate the bot credential at startup

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Long-poll timeout for getUpdates, in seconds
const UPDATE_TIMEOUT_SECS: u64 = 60;

/// Generic Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if self.ok {
            self.result
                .ok_or_else(|| Error::Telegram(format!("{method}: ok response without result")))
        } else {
            Err(Error::Telegram(format!(
                "{method}: {}",
                self.description.unwrap_or_else(|| "unknown error".to_string())
            )))
        }
    }
}

/// Bot identity from getMe
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Inbound update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// Chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat reference
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Inline keyboard button tap
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Inline keyboard markup
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// Inline keyboard button with callback data
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: &str, callback_data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: callback_data.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
    disable_notification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesParams {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackParams<'a> {
    callback_query_id: &'a str,
}

/// Telegram Bot API client
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    /// Create new Telegram client for the given bot token
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(format!("https://api.telegram.org/bot{token}"))
    }

    /// Create new Telegram client against a custom API base URL
    pub fn with_base_url(base_url: String) -> Result<Self> {
        // Long-poll requests sit open for UPDATE_TIMEOUT_SECS, so the client
        // timeout must exceed it.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPDATE_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Validate the bot credential; failure here is fatal at startup
    pub async fn get_me(&self) -> Result<BotUser> {
        let url = format!("{}/getMe", self.base_url);
        let resp: ApiResponse<BotUser> = self.client.get(&url).send().await?.json().await?;
        resp.into_result("getMe")
    }

    /// Send a text message to a chat
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        disable_notification: bool,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let params = SendMessageParams {
            chat_id,
            text,
            disable_notification,
            reply_markup,
        };

        let resp: ApiResponse<serde_json::Value> =
            self.client.post(&url).json(&params).send().await?.json().await?;
        resp.into_result("sendMessage")?;
        Ok(())
    }

    /// Long-poll for inbound updates past the given offset
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let params = GetUpdatesParams {
            offset,
            timeout: UPDATE_TIMEOUT_SECS,
        };

        let resp: ApiResponse<Vec<Update>> =
            self.client.post(&url).json(&params).send().await?.json().await?;
        resp.into_result("getUpdates")
    }

    /// Acknowledge a callback query (stops the client-side spinner)
    pub async fn answer_callback(&self, callback_query_id: &str) -> Result<()> {
        let url = format!("{}/answerCallbackQuery", self.base_url);
        let params = AnswerCallbackParams { callback_query_id };

        let resp: ApiResponse<serde_json::Value> =
            self.client.post(&url).json(&params).send().await?.json().await?;
        resp.into_result("answerCallbackQuery")?;
        Ok(())
    }
}

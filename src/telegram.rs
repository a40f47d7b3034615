//! Minimal Telegram Bot API client: long polling and plain text replies.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::conversation::{ChatOutbox, Keyboard, NEW_LETTER_BUTTON, Reply};
use crate::error::{BotError, Result};
use crate::types::{ChatId, IncomingMessage, UserId};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Long polling timeout handed to `getUpdates`, in seconds.
pub const POLL_TIMEOUT_SECS: u32 = 60;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// Username when set, otherwise the first name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

impl Update {
    /// Converts a text message update; anything else yields `None`.
    #[must_use]
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let message = self.message?;
        let from = message.from?;
        let text = message.text?;

        Some(IncomingMessage {
            user_id: UserId(from.id),
            chat_id: ChatId(message.chat.id),
            display_name: from.display_name().to_string(),
            text,
        })
    }
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

impl ReplyMarkup {
    fn from_keyboard(keyboard: Keyboard) -> Option<Self> {
        match keyboard {
            Keyboard::Unchanged => None,
            Keyboard::NewLetter => Some(ReplyMarkup::Keyboard {
                keyboard: vec![vec![KeyboardButton {
                    text: NEW_LETTER_BUTTON.to_string(),
                }]],
                resize_keyboard: true,
                one_time_keyboard: false,
            }),
            Keyboard::Remove => Some(ReplyMarkup::Remove {
                remove_keyboard: true,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u32,
    allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: i64,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct NoParams {}

pub struct TelegramClient {
    client: reqwest::Client,
    base_url: Url,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("{TELEGRAM_API_URL}/bot{bot_token}/"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(method)?;

        // The URL embeds the bot token, so keep it out of error messages.
        let response = self
            .client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let api_response: ApiResponse<T> =
            response.json().await.map_err(reqwest::Error::without_url)?;

        if !api_response.ok {
            return Err(BotError::TelegramApi {
                code: api_response.error_code,
                description: api_response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        api_response
            .result
            .ok_or_else(|| BotError::TelegramResponse(format!("{method} returned no result")))
    }

    /// Returns the bot's own account, which also verifies the token.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &NoParams {}).await
    }

    /// Waits up to `timeout` seconds for message updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u32) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request).await
    }

    pub async fn send_message(&self, chat_id: ChatId, reply: Reply) -> Result<Message> {
        debug!("Sending to chat {chat_id}: {}", reply.text);
        let request = SendMessageRequest {
            chat_id: chat_id.0,
            text: reply.text,
            reply_markup: ReplyMarkup::from_keyboard(reply.keyboard),
        };
        self.call("sendMessage", &request).await
    }
}

#[async_trait]
impl ChatOutbox for TelegramClient {
    async fn deliver(&self, chat_id: ChatId, reply: Reply) -> Result<()> {
        self.send_message(chat_id, reply).await.map(|_| ())
    }
}

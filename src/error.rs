use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse secrets file {path}: {source}")]
    SecretsFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger setup error: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Telegram API error ({code:?}): {description}")]
    TelegramApi {
        code: Option<i64>,
        description: String,
    },

    #[error("Telegram response error: {0}")]
    TelegramResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;

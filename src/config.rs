use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{BotError, Result};

pub const DEFAULT_SECRETS_FILE: &str = "secrets.json";
pub const DEFAULT_UNISENDER_API_URL: &str = "https://api.unisender.com/ru/api/sendEmail";

/// Command-line flags. Each flag falls back to an environment variable.
#[derive(Debug, Parser)]
#[command(
    name = "letterbot",
    about = "Telegram bot that forwards letters through Unisender"
)]
pub struct Cli {
    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN")]
    pub bot_token: Option<String>,

    /// Unisender API key
    #[arg(long, env = "UNISENDER_API_KEY")]
    pub unisender_api_key: Option<String>,

    /// Address every letter is delivered to
    #[arg(long, env = "TARGET_EMAIL")]
    pub target_email: Option<String>,

    /// Sender address verified in Unisender
    #[arg(long, env = "SENDER_EMAIL")]
    pub sender_email: Option<String>,

    /// Write logs to this file (truncated on start) instead of stderr
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// JSON file with fallback values for the flags above
    #[arg(long, env = "SECRETS_FILE", default_value = DEFAULT_SECRETS_FILE)]
    pub secrets_file: PathBuf,

    #[arg(long, env = "UNISENDER_API_URL", default_value = DEFAULT_UNISENDER_API_URL)]
    pub unisender_api_url: String,
}

/// Contents of the secrets file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    pub bot_token: Option<String>,
    pub unisender_api_key: Option<String>,
    pub target_email: Option<String>,
    pub sender_email: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Secrets {
    /// Reads the secrets file.
    ///
    /// Returns `Ok(None)` when the file cannot be read, since every value may
    /// also be supplied on the command line. A file that exists but does not
    /// parse is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Ok(data) = fs::read_to_string(path) else {
            return Ok(None);
        };

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| BotError::SecretsFile {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub unisender_api_key: String,
    pub unisender_api_url: String,
    pub target_email: String,
    pub sender_email: String,
    pub log_file: Option<PathBuf>,
    /// Secrets file the configuration was merged with, if one was found
    pub secrets_file: Option<PathBuf>,
}

impl Config {
    /// Parses the command line and environment, then merges in the secrets file.
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();
        let secrets = Secrets::load(&cli.secrets_file)?;
        Self::resolve(cli, secrets)
    }

    /// Merges flags over secrets and checks that every mandatory value is present.
    pub fn resolve(cli: Cli, secrets: Option<Secrets>) -> Result<Self> {
        let secrets_file = secrets.as_ref().map(|_| cli.secrets_file.clone());
        let secrets = secrets.unwrap_or_default();

        let bot_token = choose(cli.bot_token, secrets.bot_token)
            .ok_or_else(|| missing("Telegram bot token", "bot-token", "BOT_TOKEN", "bot_token"))?;

        let unisender_api_key = choose(cli.unisender_api_key, secrets.unisender_api_key)
            .ok_or_else(|| {
                missing(
                    "Unisender API key",
                    "unisender-api-key",
                    "UNISENDER_API_KEY",
                    "unisender_api_key",
                )
            })?;

        let target_email = choose(cli.target_email, secrets.target_email).ok_or_else(|| {
            missing("target email", "target-email", "TARGET_EMAIL", "target_email")
        })?;

        let sender_email = choose(cli.sender_email, secrets.sender_email).ok_or_else(|| {
            missing("sender email", "sender-email", "SENDER_EMAIL", "sender_email")
        })?;

        let log_file = cli
            .log_file
            .or(secrets.log_file)
            .filter(|path| !path.as_os_str().is_empty());

        Ok(Self {
            bot_token,
            unisender_api_key,
            unisender_api_url: cli.unisender_api_url,
            target_email,
            sender_email,
            log_file,
            secrets_file,
        })
    }
}

/// Picks the flag value unless it is absent or empty.
fn choose(flag: Option<String>, fallback: Option<String>) -> Option<String> {
    flag.filter(|value| !value.is_empty())
        .or_else(|| fallback.filter(|value| !value.is_empty()))
}

fn missing(what: &str, flag: &str, env: &str, key: &str) -> BotError {
    BotError::Config(format!(
        "{what} is not set; pass --{flag}, set {env} or add \"{key}\" to the secrets file"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_cli() -> Cli {
        Cli {
            bot_token: Some("123:abc".to_string()),
            unisender_api_key: Some("key".to_string()),
            target_email: Some("to@example.com".to_string()),
            sender_email: Some("from@example.com".to_string()),
            log_file: None,
            secrets_file: PathBuf::from(DEFAULT_SECRETS_FILE),
            unisender_api_url: DEFAULT_UNISENDER_API_URL.to_string(),
        }
    }

    #[test]
    fn flags_alone_are_enough() {
        let config = Config::resolve(full_cli(), None).expect("config should resolve");
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.target_email, "to@example.com");
        assert!(config.log_file.is_none());
        assert!(config.secrets_file.is_none());
    }

    #[test]
    fn flags_take_precedence_over_secrets() {
        let secrets: Secrets = serde_json::from_str(
            r#"{"bot_token":"file-token","target_email":"file@example.com","log_file":"bot.log"}"#,
        )
        .expect("valid secrets");

        let config = Config::resolve(full_cli(), Some(secrets)).expect("config should resolve");
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.target_email, "to@example.com");
        assert_eq!(config.log_file, Some(PathBuf::from("bot.log")));
        assert_eq!(config.secrets_file, Some(PathBuf::from(DEFAULT_SECRETS_FILE)));
    }

    #[test]
    fn empty_flag_falls_back_to_secrets() {
        let mut cli = full_cli();
        cli.sender_email = Some(String::new());
        let secrets = Secrets {
            sender_email: Some("file@example.com".to_string()),
            ..Secrets::default()
        };

        let config = Config::resolve(cli, Some(secrets)).expect("config should resolve");
        assert_eq!(config.sender_email, "file@example.com");
    }

    #[test]
    fn missing_value_is_a_config_error() {
        let mut cli = full_cli();
        cli.unisender_api_key = None;

        let err = Config::resolve(cli, None).expect_err("missing key must fail");
        assert!(matches!(err, BotError::Config(ref msg) if msg.contains("--unisender-api-key")));
    }

    #[test]
    fn missing_secrets_file_is_not_an_error() {
        let path = Path::new("definitely/not/here/secrets.json");
        assert!(Secrets::load(path).expect("missing file is fine").is_none());
    }

    #[test]
    fn flags_parse_from_command_line() {
        let cli = Cli::try_parse_from([
            "letterbot",
            "--bot-token",
            "t",
            "--unisender-api-key",
            "k",
            "--target-email",
            "to@example.com",
            "--sender-email",
            "from@example.com",
        ])
        .expect("flags should parse");

        assert_eq!(cli.bot_token.as_deref(), Some("t"));
        assert_eq!(cli.unisender_api_key.as_deref(), Some("k"));
    }
}

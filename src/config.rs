//! Configuration management

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_AUTHOR_CAPACITY;
use crate::classifier::DEFAULT_API_URL;

/// Identities and timings the handlers depend on
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Username whose messages go through the classifier (lowercase, no @)
    pub subject_username: Option<String>,

    /// Genitive display name of the designated subject ("Рейтинг Данилы")
    pub subject_display_name: String,

    /// Username whose messages are dropped entirely
    pub blocked_username: Option<String>,

    /// Only this username may reset the global rating
    pub reset_admin_username: Option<String>,

    /// User id that gets roasted for every text message
    pub roast_user_id: Option<i64>,

    /// Delay between deleting the trigger and deleting the bot reply
    pub cleanup_delay: Duration,

    /// Message author cache capacity
    pub author_cache_capacity: usize,

    /// This bot's own username, filled in from `getMe` at startup.
    /// `/cmd@name` commands addressed to anyone else are ignored.
    pub bot_username: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            subject_username: Some("danilalox".to_string()),
            subject_display_name: "Данилы".to_string(),
            blocked_username: Some("chemiakin".to_string()),
            reset_admin_username: Some("purpletooth".to_string()),
            roast_user_id: Some(5301118406),
            cleanup_delay: Duration::from_millis(2000),
            author_cache_capacity: DEFAULT_AUTHOR_CAPACITY,
            bot_username: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub telegram_token: String,

    /// Rating JSON file
    pub data_path: PathBuf,

    /// Chat-completions endpoint used for moderation
    pub moderation_url: String,

    /// Per-call network timeout for the moderation endpoint
    pub moderation_timeout: Duration,

    /// Total attempts per moderation call
    pub moderation_max_retries: u32,

    pub bot: BotSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let telegram_token = std::env::var("TELOXIDE_TOKEN")
            .or_else(|_| std::env::var("TELEGRAM_BOT_TOKEN"))
            .context("TELOXIDE_TOKEN or TELEGRAM_BOT_TOKEN must be set")?;

        let data_path = std::env::var("RATING_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("social-rating-bot")
                    .join("rating.json")
            });

        let moderation_url = std::env::var("MODERATION_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let moderation_timeout = Duration::from_secs(env_parse("MODERATION_TIMEOUT_SECS", 15)?);
        let moderation_max_retries = env_parse("MODERATION_MAX_RETRIES", 2)?;

        let defaults = BotSettings::default();
        let bot = BotSettings {
            subject_username: env_identity("SUBJECT_USERNAME", defaults.subject_username),
            subject_display_name: std::env::var("SUBJECT_DISPLAY_NAME")
                .unwrap_or(defaults.subject_display_name),
            blocked_username: env_identity("BLOCKED_USERNAME", defaults.blocked_username),
            reset_admin_username: env_identity("RESET_ADMIN_USERNAME", defaults.reset_admin_username),
            roast_user_id: match std::env::var("ROAST_USER_ID") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v.trim().parse().context("ROAST_USER_ID must be an integer")?),
                Err(_) => defaults.roast_user_id,
            },
            cleanup_delay: Duration::from_millis(env_parse("CLEANUP_DELAY_MS", 2000)?),
            author_cache_capacity: env_parse("AUTHOR_CACHE_CAPACITY", DEFAULT_AUTHOR_CAPACITY)?,
            bot_username: None,
        };

        Ok(Self {
            telegram_token,
            data_path,
            moderation_url,
            moderation_timeout,
            moderation_max_retries,
            bot,
        })
    }
}

/// Numeric variable with a default; a present but malformed value is an error
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, v)),
        Err(_) => Ok(default),
    }
}

/// Username variable: unset keeps the default, empty disables
fn env_identity(key: &str, default: Option<String>) -> Option<String> {
    match std::env::var(key) {
        Ok(v) => normalize_identity(&v),
        Err(_) => default,
    }
}

fn normalize_identity(value: &str) -> Option<String> {
    let v = value.trim().trim_start_matches('@').to_lowercase();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

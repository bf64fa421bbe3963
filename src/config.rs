//! Configuration and settings management
//!
//! Loads settings from environment variables and defines transfer tunables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Telegram user ID of the bot owner, always allowed
    pub owner_id: Option<i64>,

    /// Comma-separated list of additionally authorized user IDs
    #[serde(rename = "auth_users")]
    pub auth_users_str: Option<String>,

    /// Directory downloaded files are staged in before upload
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Maximum size in bytes of a file the bot will relay
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

const fn default_max_file_size() -> u64 {
    // Telegram's ceiling for bot uploads (~2 GB)
    2 * 1024 * 1024 * 1024
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use url_courier::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `TELEGRAM_TOKEN` is absent.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the set of Telegram IDs that are allowed to use the bot.
    ///
    /// The owner is always part of the set when configured.
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        let mut users: HashSet<i64> = self
            .auth_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(owner) = self.owner_id {
            users.insert(owner);
        }
        users
    }

    /// Whether a user may use the bot.
    ///
    /// An empty authorization list leaves the bot open to everyone.
    #[must_use]
    pub fn is_allowed(&self, user_id: i64) -> bool {
        let allowed = self.allowed_users();
        allowed.is_empty() || allowed.contains(&user_id)
    }
}

/// Minimum seconds between consecutive edits of a progress status message
pub const PROGRESS_EDIT_INTERVAL_SECS: u64 = 5;

/// Connect timeout for download requests, in seconds
pub const DOWNLOAD_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Idle per-read timeout for download streams, in seconds.
/// There is deliberately no total-transfer deadline.
pub const DOWNLOAD_READ_TIMEOUT_SECS: u64 = 60;
/// Write-buffer capacity for streaming downloads (1 MiB)
pub const DOWNLOAD_BUFFER_SIZE: usize = 1024 * 1024;

/// Maximum simultaneous transfers, to avoid Telegram flood limits
pub const MAX_CONCURRENT_TRANSFERS: usize = 3;

/// Initial backoff for Telegram API retries, in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff for Telegram API retries, in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum attempts for retried Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            telegram_token: "dummy".to_string(),
            owner_id: None,
            auth_users_str: None,
            download_dir: "downloads".to_string(),
            max_file_size: default_max_file_size(),
        }
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = base_settings();

        // Comma
        settings.auth_users_str = Some("123,456".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&123));
        assert!(allowed.contains(&456));
        assert_eq!(allowed.len(), 2);

        // Space
        settings.auth_users_str = Some("111 222".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&111));
        assert!(allowed.contains(&222));
        assert_eq!(allowed.len(), 2);

        // Semicolon and mixed
        settings.auth_users_str = Some("333; 444, 555".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&333));
        assert!(allowed.contains(&444));
        assert!(allowed.contains(&555));
        assert_eq!(allowed.len(), 3);

        // Bad tokens are dropped
        settings.auth_users_str = Some("abc, 777".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&777));
        assert_eq!(allowed.len(), 1);
    }

    #[test]
    fn test_owner_always_allowed() {
        let mut settings = base_settings();
        settings.owner_id = Some(42);
        settings.auth_users_str = Some("100".to_string());

        assert!(settings.is_allowed(42));
        assert!(settings.is_allowed(100));
        assert!(!settings.is_allowed(7));
    }

    #[test]
    fn test_empty_list_leaves_bot_open() {
        let settings = base_settings();
        assert!(settings.is_allowed(12345));
    }
}

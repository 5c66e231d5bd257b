use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PonteError;

/// Top-level Ponte configuration.
///
/// Loaded from a TOML file, then overridden by environment variables
/// (the original deployment contract): `TELEGRAM_BOT_TOKEN`,
/// `TELEGRAM_GROUP_ID`, `TELEGRAM_TOPIC_ID`, `TELEGRAM_TOPIC_ID_STATUS`,
/// and `DEFAULT_ADMIN_ID`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ponte: PonteConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// General bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PonteConfig {
    /// Base directory for the WhatsApp session and other runtime data.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PonteConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Telegram destination config.
///
/// `group_id` is the forum group the bridge lives in; `topic_primary`
/// receives mirrored chats, `topic_status` receives status updates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub topic_primary: i64,
    #[serde(default)]
    pub topic_status: i64,
    /// Telegram user id of the immutable super-admin.
    #[serde(default)]
    pub super_admin_id: String,
}

/// Contact/admin store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.ponte".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_path() -> String {
    "~/.ponte/contacts.db".to_string()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing file is not an error — the environment alone can carry a full
/// configuration. Missing required options are caught by [`Config::validate`].
pub fn load(path: &str) -> Result<Config, PonteError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PonteError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| PonteError::Config(format!("failed to parse config: {e}")))?
    } else {
        tracing::info!(
            "Config file not found at {}, using environment only",
            path.display()
        );
        Config::default()
    };

    config.apply_env();
    Ok(config)
}

impl Config {
    /// Overlay recognized environment variables onto the file-based config.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(id) = env_i64("TELEGRAM_GROUP_ID") {
            self.telegram.group_id = id;
        }
        if let Some(id) = env_i64("TELEGRAM_TOPIC_ID") {
            self.telegram.topic_primary = id;
        }
        if let Some(id) = env_i64("TELEGRAM_TOPIC_ID_STATUS") {
            self.telegram.topic_status = id;
        }
        if let Ok(id) = std::env::var("DEFAULT_ADMIN_ID") {
            self.telegram.super_admin_id = id;
        }
    }

    /// Check that every required option is present. Startup-fatal when not.
    pub fn validate(&self) -> Result<(), PonteError> {
        let tg = &self.telegram;
        let missing: &str = if tg.bot_token.is_empty() {
            "telegram.bot_token (TELEGRAM_BOT_TOKEN)"
        } else if tg.group_id == 0 {
            "telegram.group_id (TELEGRAM_GROUP_ID)"
        } else if tg.topic_primary == 0 {
            "telegram.topic_primary (TELEGRAM_TOPIC_ID)"
        } else if tg.topic_status == 0 {
            "telegram.topic_status (TELEGRAM_TOPIC_ID_STATUS)"
        } else if tg.super_admin_id.is_empty() {
            "telegram.super_admin_id (DEFAULT_ADMIN_ID)"
        } else {
            return Ok(());
        };

        Err(PonteError::Config(format!(
            "missing required option: {missing}"
        )))
    }
}

fn env_i64(name: &str) -> Option<i64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ponte.data_dir, "~/.ponte");
        assert_eq!(config.ponte.log_level, "info");
        assert_eq!(config.store.db_path, "~/.ponte/contacts.db");
        assert!(config.telegram.bot_token.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [ponte]
            data_dir = "/var/lib/ponte"

            [telegram]
            bot_token = "123:abc"
            group_id = -1001234567890
            topic_primary = 2
            topic_status = 3
            super_admin_id = "99887766"

            [store]
            db_path = "/var/lib/ponte/contacts.db"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.group_id, -1001234567890);
        assert_eq!(config.telegram.topic_primary, 2);
        assert_eq!(config.telegram.topic_status, 3);
        assert_eq!(config.telegram.super_admin_id, "99887766");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[telegram]\nbot_token = \"t\"").unwrap();
        assert_eq!(config.ponte.log_level, "info");
        assert_eq!(config.store.db_path, "~/.ponte/contacts.db");
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn test_validate_rejects_missing_topics() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".into();
        config.telegram.group_id = -100;
        config.telegram.topic_primary = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("topic_status"));
    }

    #[test]
    fn test_validate_rejects_missing_super_admin() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".into();
        config.telegram.group_id = -100;
        config.telegram.topic_primary = 1;
        config.telegram.topic_status = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("super_admin_id"));
    }

    #[test]
    fn test_shellexpand_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(shellexpand("~/x/y"), "/home/tester/x/y");
        assert_eq!(shellexpand("/abs/path"), "/abs/path");
    }
}

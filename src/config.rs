use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Reproducción
    pub default_volume: f32,
    pub max_queue_size: usize,
    pub max_history: usize,
    pub max_playlist_size: usize,

    // Comportamiento de sesión
    pub keep_history: bool,
    pub leave_on_stop: bool,
    pub leave_on_finish: bool,
    pub enable_autoplay: bool,

    // Paths
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Reproducción
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            max_history: std::env::var("MAX_HISTORY")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            // Comportamiento de sesión
            keep_history: std::env::var("KEEP_HISTORY")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            leave_on_stop: std::env::var("LEAVE_ON_STOP")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            leave_on_finish: std::env::var("LEAVE_ON_FINISH")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            enable_autoplay: std::env::var("ENABLE_AUTOPLAY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
        };

        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Queue and playlist limits must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.max_playlist_size > self.max_queue_size {
            anyhow::bail!(
                "Max playlist size ({}) cannot exceed max queue size ({})",
                self.max_playlist_size,
                self.max_queue_size
            );
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes sensitive information like tokens.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Playback: {}% vol, {} queue, {} history, {} playlist cap\n  \
            Session: keep_history={}, leave_on_stop={}, leave_on_finish={}, autoplay={}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.max_queue_size,
            self.max_history,
            self.max_playlist_size,
            self.keep_history,
            self.leave_on_stop,
            self.leave_on_finish,
            self.enable_autoplay
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            // Playback defaults
            default_volume: 0.5,
            max_queue_size: 100,
            max_history: 50,
            max_playlist_size: 100,

            // Session defaults
            keep_history: true,
            leave_on_stop: true,
            leave_on_finish: true,
            enable_autoplay: false,

            // Path defaults
            data_dir: "data".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config {
            default_volume: 2.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.default_volume = 0.5;
        config.max_queue_size = 0;
        assert!(config.validate().is_err());

        config.max_queue_size = 10;
        config.max_playlist_size = 20;
        assert!(config.validate().is_err());
    }
}

//! Application configuration loading from config.toml and the environment.
//!
//! `config.toml` is optional. Every value has a default, and a handful of
//! environment variables override the file so deployments can be configured
//! from `.env` alone.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which Record Store implementation to open at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `SeaORM` collections in a database
    #[default]
    Database,
    /// A single JSON document on disk
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "file" | "json" => Ok(Self::File),
            other => Err(Error::Config {
                message: format!("Unknown store backend '{other}' (expected 'database' or 'file')"),
            }),
        }
    }
}

/// Storage settings, the `[storage]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            data_file: PathBuf::from("data/database.json"),
        }
    }
}

/// Discord front-end settings, the `[bot]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Guild to register commands in; global registration when absent
    pub guild_id: Option<u64>,
    /// Channel that receives vouch embeds
    pub vouch_channel_id: Option<u64>,
    /// Minimum number of characters in a vouch reason
    pub min_reason_length: usize,
    /// "Watching ..." activity text
    pub presence: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            guild_id: None,
            vouch_channel_id: None,
            min_reason_length: 10,
            presence: "Reviews & Testimonials".to_string(),
        }
    }
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub bot: BotConfig,
}

impl AppConfig {
    /// Applies environment overrides through `lookup`, which returns the value
    /// of a variable if it is set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(path) = lookup("DATA_FILE") {
            self.storage.data_file = PathBuf::from(path);
        }
        if let Some(guild_id) = lookup("GUILD_ID") {
            self.bot.guild_id = Some(parse_id("GUILD_ID", &guild_id)?);
        }
        if let Some(channel_id) = lookup("VOUCH_CHANNEL_ID") {
            self.bot.vouch_channel_id = Some(parse_id("VOUCH_CHANNEL_ID", &channel_id)?);
        }
        Ok(())
    }
}

fn parse_id(name: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("{name} must be a numeric Discord ID, got '{value}': {e}"),
    })
}

/// Loads configuration from a TOML file. A missing file yields the defaults.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads ./config.toml and applies process environment overrides.
pub fn load_app_config() -> Result<AppConfig> {
    let mut config = load_config("config.toml")?;
    config.apply_overrides(|name| std::env::var(name).ok())?;
    tracing::info!(
        backend = ?config.storage.backend,
        "Loaded application configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_app_config() {
        let toml_str = r#"
            [storage]
            backend = "file"
            data_file = "/tmp/vouches.json"

            [bot]
            vouch_channel_id = 1309783318031503384
            min_reason_length = 20
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, StoreBackend::File);
        assert_eq!(config.storage.data_file, PathBuf::from("/tmp/vouches.json"));
        assert_eq!(config.storage.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bot.vouch_channel_id, Some(1_309_783_318_031_503_384));
        assert_eq!(config.bot.guild_id, None);
        assert_eq!(config.bot.min_reason_length, 20);
        assert_eq!(config.bot.presence, "Reviews & Testimonials");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage\nbackend = ").unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STORE_BACKEND", "json"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("GUILD_ID", "42"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.storage.backend, StoreBackend::File);
        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.bot.guild_id, Some(42));
        assert_eq!(config.bot.vouch_channel_id, None);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "VOUCH_CHANNEL_ID").then(|| "not-a-number".to_string())
        });
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = config
            .apply_overrides(|name| (name == "STORE_BACKEND").then(|| "mongo".to_string()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

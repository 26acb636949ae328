/// Application configuration from config.toml and environment variables
pub mod app;

/// Database configuration and connection management
pub mod database;

pub use app::{AppConfig, BotConfig, StorageConfig, StoreBackend, load_app_config};

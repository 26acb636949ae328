use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Ticket {id} already exists")]
    DuplicateTicket { id: i64 },

    #[error("Vouch {id} already exists")]
    DuplicateVouch { id: i64 },

    #[error("Invalid rating: {stars} (must be between 1 and 5)")]
    InvalidRating { stars: i32 },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// True for duplicate-key failures, whether caught before the insert or
    /// reported by the storage engine.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::DuplicateTicket { .. } | Self::DuplicateVouch { .. } => true,
            Self::Database(err) => matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
            _ => false,
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

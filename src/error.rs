use chrono::Duration;
use thiserror::Error;

use crate::domain::cooldown::format_wait;
use crate::domain::error::{PermissionError, ValidationError};
use crate::domain::id::CommandId;

/// Message shown to users when storage fails underneath them.
pub const TRY_AGAIN_LATER: &str = "Something went wrong. Please try again later.";

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The command was used again before its cooldown ran out.
    #[error("command '{command_id}' is on cooldown for {}", format_wait(.remaining))]
    OnCooldown {
        command_id: CommandId,
        remaining: Duration,
    },

    /// No pooled connection could be obtained.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the backing store failed, as opposed to the request being
    /// rejected.
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Database(_) | Self::Parse(_)
        )
    }

    /// Text suitable for direct user feedback.
    ///
    /// Rejections are explained; storage failures collapse to a generic
    /// retry hint so internals never leak into chat.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_persistence() {
            TRY_AGAIN_LATER.to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Logging for storage failures at the service boundary.
pub(crate) trait LogPersistence {
    /// Log the error with `operation` as context when the store failed.
    #[must_use]
    fn log_persistence(self, operation: &'static str) -> Self;
}

impl<T> LogPersistence for Result<T> {
    fn log_persistence(self, operation: &'static str) -> Self {
        if let Err(e) = &self {
            if e.is_persistence() {
                tracing::error!(operation, error = %e, "Persistence failure");
            }
        }
        self
    }
}

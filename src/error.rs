// Error types for fetching candles and starting seed runs

use thiserror::Error;

/// Failure reported by a candle source. `retryable` replaces message pattern matching:
/// non-retryable errors (client-error class responses) end the task immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    pub retryable: bool,
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    /// Nothing to seed or unusable input; no tasks are created.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for SeedError {
    fn from(e: sqlx::Error) -> Self {
        SeedError::Store(e.into())
    }
}

use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve or parse a single feed. Always recovered by the
/// aggregator; never reaches an HTTP caller.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed feed: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("feed '{source_name}' unavailable: {reason}")]
    FeedUnavailable { source_name: String, reason: FeedError },

    #[error("invalid {field} '{value}'")]
    InvalidQuery {
        field: &'static str,
        value: String,
        valid: Vec<String>,
    },

    #[error("aggregation failed: {0}")]
    Internal(String),
}

impl AggregatorError {
    pub fn invalid(field: &'static str, value: impl Into<String>, valid: Vec<String>) -> Self {
        AggregatorError::InvalidQuery {
            field,
            value: value.into(),
            valid,
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, AggregatorError::InvalidQuery { .. })
    }
}

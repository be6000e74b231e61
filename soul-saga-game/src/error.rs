use thiserror::Error;

/// Errors raised by the saga core.
///
/// Missing missions are not errors: lookups return `None`/`false` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SagaError {
    #[error("unknown reward rarity `{0}` (expected common, rare, epic or legendary)")]
    InvalidRarity(String),
    #[error("reward configuration invalid: {0}")]
    Configuration(String),
    #[error("failed to persist `{key}`: {message}")]
    Persistence { key: String, message: String },
}

impl SagaError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

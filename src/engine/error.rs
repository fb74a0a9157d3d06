use thiserror::Error;

/// Validation failures surfaced by the recommendation and tuning engine.
///
/// Gate misses are never errors; a candidate that does not clear a threshold
/// is simply left out of the result.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("invalid config version {0}: must be a non-negative integer")]
    InvalidConfigVersion(i64),

    #[error("malformed stored config: {0}")]
    MalformedConfig(String),

    #[error("config version {0} cannot be incremented")]
    VersionExhausted(i64),
}

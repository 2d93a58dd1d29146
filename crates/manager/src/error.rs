use serde_json::Value;
use thiserror::Error;
use vecbatch_engine::EngineError;

use crate::store::RequestId;

/// Errors returned to a caller of [`VectorManager::create`](crate::VectorManager::create).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    /// `create` was called before any engine was set.
    #[error("no vectorization engine configured; call set_engine before create")]
    EngineNotConfigured,

    /// The engine call covering this request failed. The engine's error is
    /// passed through unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine answered but gave no usable vector for this input.
    #[error("engine returned no usable vector for input {input}")]
    InvalidVectorResult {
        /// The value the caller passed to `create`.
        input: Value,
    },

    /// The outcome slot went away without being written, e.g. because the
    /// manager was dropped while the request was queued.
    #[error("outcome for request {id} was dropped before it was written")]
    ResultDropped {
        /// Identity of the abandoned request.
        id: RequestId,
    },
}

/// Errors raised while building or validating a [`ManagerConfig`](crate::ManagerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the manager cannot work with.
    #[error("invalid manager configuration: {0}")]
    Invalid(String),

    /// The TOML document could not be parsed.
    #[error("failed to parse manager configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

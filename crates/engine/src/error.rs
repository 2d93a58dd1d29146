use thiserror::Error;

/// Errors returned by a [`VectorEngine`](crate::VectorEngine) call.
///
/// A single failed call covers every input of the batch it was given, so the
/// error is `Clone` and handed to each affected caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The request timed out.
    #[error("vectorization request timed out")]
    Timeout,

    /// Failed to parse the API response.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The API returned an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// A custom engine rejected the call.
    #[error("engine rejected batch: {0}")]
    Rejected(String),
}

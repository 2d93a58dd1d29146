use serde::Deserialize;

/// Configuration for an HTTP-based vectorization engine.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpEngineConfig {
    /// The API endpoint (e.g., `https://api.openai.com/v1/embeddings`).
    pub endpoint: String,
    /// The model name (e.g., `text-embedding-3-small`).
    pub model: String,
    /// API key for authentication.
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

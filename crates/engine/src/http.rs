use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::HttpEngineConfig;
use crate::engine::{EngineOutput, VectorEngine};
use crate::error::EngineError;

/// A vectorization engine that calls an OpenAI-compatible `/v1/embeddings` API
/// with the whole batch in one request.
pub struct HttpVectorEngine {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpVectorEngine {
    /// Create a new HTTP engine from the given configuration.
    pub fn new(config: HttpEngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EngineError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            model: config.model,
            api_key: config.api_key,
        })
    }
}

impl std::fmt::Debug for HttpVectorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVectorEngine")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// `OpenAI` embeddings API request body.
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// A single entry of the `data` array.
#[derive(Deserialize)]
struct EmbeddingData {
    index: Option<usize>,
    embedding: Option<Vec<f32>>,
}

/// Align an embeddings API response with the `expected` inputs.
///
/// Entries are placed by their `index` field when present, otherwise by
/// position. A `data` field that is not an array yields no vectors, so every
/// input ends up without a usable entry.
fn align_response(body: &Value, expected: usize) -> EngineOutput {
    let mut out: EngineOutput = vec![None; expected];
    let Some(entries) = body.get("data").and_then(Value::as_array) else {
        return out;
    };

    for (position, entry) in entries.iter().enumerate() {
        let Ok(data) = EmbeddingData::deserialize(entry) else {
            continue;
        };
        let slot = data.index.unwrap_or(position);
        if let Some(target) = out.get_mut(slot) {
            *target = data.embedding;
        }
    }
    out
}

#[async_trait]
impl VectorEngine for HttpVectorEngine {
    async fn vectorize(&self, inputs: &[String]) -> Result<EngineOutput, EngineError> {
        debug!(model = %self.model, inputs = inputs.len(), "requesting embeddings");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout
                } else {
                    EngineError::HttpError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".to_owned());
            return Err(EngineError::ApiError(format!("status {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::ParseError(e.to_string()))?;

        Ok(align_response(&body, inputs.len()))
    }
}

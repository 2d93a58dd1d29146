use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::{EngineOutput, Vector, VectorEngine};
use crate::error::EngineError;

/// A mock engine that returns the same fixed vector for every input.
///
/// Records the inputs of every call and the peak number of overlapping calls
/// so tests can verify batching and concurrency behaviour. An optional delay
/// keeps each call in flight for a while.
pub struct FixedVectorEngine {
    vector: Vector,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FixedVectorEngine {
    /// Create a mock engine returning the given fixed vector.
    pub fn new(vector: Vector) -> Self {
        Self {
            vector,
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Hold every call open for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times [`vectorize`](VectorEngine::vectorize) was called.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Inputs of every call, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorEngine for FixedVectorEngine {
    async fn vectorize(&self, inputs: &[String]) -> Result<EngineOutput, EngineError> {
        self.calls.lock().push(inputs.to_vec());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|_| Some(self.vector.clone())).collect())
    }
}

/// A mock engine that maps specific text to specific vectors.
///
/// Unknown texts get no entry, which callers observe as an unusable result.
pub struct MappingVectorEngine {
    mappings: HashMap<String, Vector>,
}

impl MappingVectorEngine {
    /// Create a mapping engine with the given text-to-vector mappings.
    pub fn new(mappings: HashMap<String, Vector>) -> Self {
        Self { mappings }
    }
}

#[async_trait]
impl VectorEngine for MappingVectorEngine {
    async fn vectorize(&self, inputs: &[String]) -> Result<EngineOutput, EngineError> {
        Ok(inputs
            .iter()
            .map(|text| self.mappings.get(text).cloned())
            .collect())
    }
}

/// A mock engine that always returns an error.
pub struct FailingVectorEngine;

#[async_trait]
impl VectorEngine for FailingVectorEngine {
    async fn vectorize(&self, _inputs: &[String]) -> Result<EngineOutput, EngineError> {
        Err(EngineError::ApiError("mock failure".to_owned()))
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};
use vecbatch_engine::{Vector, VectorEngine};

use crate::batcher::split;
use crate::config::ManagerConfig;
use crate::convert::to_input_string;
use crate::dispatch::dispatch;
use crate::error::{ConfigError, VectorError};
use crate::metrics::ManagerMetrics;
use crate::queue::{Flush, PendingRequest, RequestQueue};
use crate::store::{Outcome, RequestId, ResultStore};
use crate::timer;

/// State shared between the facade handles and the debounce timer task.
pub(crate) struct Shared {
    engine: RwLock<Option<Arc<dyn VectorEngine>>>,
    config: RwLock<ManagerConfig>,
    pub(crate) queue: RequestQueue,
    store: ResultStore,
    pub(crate) metrics: Arc<ManagerMetrics>,
    next_id: AtomicU64,
}

impl Shared {
    pub(crate) fn config(&self) -> ManagerConfig {
        *self.config.read()
    }

    /// Batch and dispatch a queue snapshot, then release the flush.
    pub(crate) async fn flush(&self, mut flush: Flush<'_>) {
        let requests = flush.take_requests();
        if requests.is_empty() {
            return;
        }

        let engine = self.engine.read().clone();
        let Some(engine) = engine else {
            warn!(
                requests = requests.len(),
                "no engine configured at flush time, abandoning requests"
            );
            for request in requests {
                self.store.discard(request.id);
            }
            return;
        };

        let config = self.config();
        self.metrics.increment_flushes();

        let count = requests.len();
        let batches = split(
            requests.into_iter().map(|r| (r.id, r.text)),
            config.max_batch_size,
        );
        debug!(requests = count, batches = batches.len(), "flushing queue");

        let summary = dispatch(
            batches,
            engine.as_ref(),
            config.max_parallel_requests,
            &self.store,
            &self.metrics,
        )
        .await;

        debug!(
            waves = summary.waves,
            batches = summary.batches,
            failed_batches = summary.failed_batches,
            delivered = summary.delivered,
            malformed = summary.malformed,
            "flush complete"
        );
    }
}

/// Entry point for callers that want one vector per value.
///
/// Cloning is cheap; every clone shares the same queue, timer, engine and
/// configuration.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use vecbatch_engine::FixedVectorEngine;
/// use vecbatch_manager::VectorManager;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = VectorManager::new();
/// manager.set_engine(Arc::new(FixedVectorEngine::new(vec![0.1, 0.2])));
///
/// let vector = manager.create("hello").await.unwrap();
/// assert_eq!(vector, vec![0.1, 0.2]);
/// # }
/// ```
#[derive(Clone)]
pub struct VectorManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for VectorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorManager")
            .field("config", &self.config())
            .field("has_engine", &self.has_engine())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Default for VectorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorManager {
    /// Create a manager with the default configuration and no engine.
    pub fn new() -> Self {
        Self::from_parts(ManagerConfig::default())
    }

    /// Create a manager with the given configuration and no engine.
    pub fn with_config(config: ManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: ManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: RwLock::new(None),
                config: RwLock::new(config),
                queue: RequestQueue::new(),
                store: ResultStore::new(),
                metrics: Arc::new(ManagerMetrics::default()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Set the engine used by every subsequent flush.
    pub fn set_engine(&self, engine: Arc<dyn VectorEngine>) {
        *self.shared.engine.write() = Some(engine);
    }

    /// Whether an engine has been set.
    pub fn has_engine(&self) -> bool {
        self.shared.engine.read().is_some()
    }

    /// Current configuration.
    pub fn config(&self) -> ManagerConfig {
        self.shared.config()
    }

    /// Replace the configuration. Timers already sleeping are not shortened
    /// or extended.
    pub fn set_config(&self, config: ManagerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.shared.config.write() = config;
        Ok(())
    }

    /// Return a shared handle to the manager's counters.
    pub fn metrics(&self) -> Arc<ManagerMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    /// Number of requests queued and not yet flushed.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Vectorize one value.
    ///
    /// The request joins the shared queue and is sent to the engine with
    /// whatever else arrives during the debounce window. There is no
    /// deadline: the call waits as long as the engine takes.
    ///
    /// Must be polled inside a Tokio runtime; the first request of a cycle
    /// spawns the debounce timer task.
    pub async fn create(&self, value: impl Into<Value>) -> Result<Vector, VectorError> {
        let value = value.into();
        if !self.has_engine() {
            return Err(VectorError::EngineNotConfigured);
        }

        let id: RequestId = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = self.shared.store.register(id);
        self.enqueue(PendingRequest {
            id,
            text: to_input_string(&value),
        });

        match slot.wait().await {
            Some(outcome) => classify(outcome, value),
            None => Err(VectorError::ResultDropped { id }),
        }
    }

    /// Vectorize many values concurrently.
    ///
    /// Waits for every value and returns one result per input, in input
    /// order. A failure only affects its own position.
    pub async fn batch_create<I, V>(&self, values: I) -> Vec<Result<Vector, VectorError>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        join_all(values.into_iter().map(|value| self.create(value))).await
    }

    /// Like [`batch_create`](Self::batch_create), but returns the first error
    /// in input order instead of per-position results.
    pub async fn try_batch_create<I, V>(&self, values: I) -> Result<Vec<Vector>, VectorError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.batch_create(values).await.into_iter().collect()
    }

    fn enqueue(&self, request: PendingRequest) {
        let id = request.id;
        self.shared.metrics.increment_enqueued();
        let arm = self.shared.queue.enqueue(request);
        debug!(id, arm_timer = arm, "request enqueued");
        if arm {
            timer::spawn(Arc::clone(&self.shared));
        }
    }
}

fn classify(outcome: Outcome, input: Value) -> Result<Vector, VectorError> {
    match outcome {
        Outcome::Success(vector) => Ok(vector),
        Outcome::Failure(e) => Err(VectorError::Engine(e)),
        Outcome::Malformed => Err(VectorError::InvalidVectorResult { input }),
    }
}

//! Coalesces concurrent single-item vectorization requests into a few
//! size-bounded engine calls.
//!
//! Callers use [`VectorManager::create`]. Requests accumulate in a shared
//! queue behind a two-stage debounce timer, get split into batches that fit
//! the configured character budget, and are dispatched to the engine in waves
//! of at most `max_parallel_requests` concurrent calls. Each caller waits only
//! on its own outcome slot.

pub mod batcher;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod queue;
pub mod store;
mod timer;

pub use batcher::{Batch, split};
pub use config::ManagerConfig;
pub use convert::to_input_string;
pub use dispatch::{DispatchSummary, dispatch};
pub use error::{ConfigError, VectorError};
pub use manager::VectorManager;
pub use metrics::{ManagerMetrics, ManagerMetricsSnapshot};
pub use store::{Outcome, OutcomeSlot, RequestId, ResultStore};

pub use vecbatch_engine::{EngineError, EngineOutput, Vector, VectorEngine, engine_fn};

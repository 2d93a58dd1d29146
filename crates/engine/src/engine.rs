use std::future::Future;

use async_trait::async_trait;

use crate::error::EngineError;

/// A dense vector produced by an engine.
pub type Vector = Vec<f32>;

/// Positional engine output: entry `k` belongs to input `k`.
///
/// `None` (or a missing trailing entry) means the engine produced nothing
/// usable for that position without failing the whole call.
pub type EngineOutput = Vec<Option<Vector>>;

/// Trait for the external batch vectorization operation.
///
/// Implementations receive an ordered list of strings and return an ordered
/// list of vectors aligned with it. Returning `Err` fails every input of the
/// call.
#[async_trait]
pub trait VectorEngine: Send + Sync {
    /// Vectorize a batch of inputs.
    async fn vectorize(&self, inputs: &[String]) -> Result<EngineOutput, EngineError>;
}

/// Adapter turning an async closure into a [`VectorEngine`].
///
/// Built with [`engine_fn`].
pub struct FnEngine<F> {
    f: F,
}

/// Wrap an async closure as a [`VectorEngine`].
///
/// ```
/// use vecbatch_engine::{EngineError, EngineOutput, VectorEngine, engine_fn};
///
/// # tokio_test_block(async {
/// let engine = engine_fn(|inputs: Vec<String>| async move {
///     Ok::<EngineOutput, EngineError>(
///         inputs.iter().map(|s| Some(vec![s.len() as f32])).collect(),
///     )
/// });
/// let out = engine.vectorize(&["abc".to_owned()]).await.unwrap();
/// assert_eq!(out, vec![Some(vec![3.0])]);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub fn engine_fn<F, Fut>(f: F) -> FnEngine<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EngineOutput, EngineError>> + Send + 'static,
{
    FnEngine { f }
}

#[async_trait]
impl<F, Fut> VectorEngine for FnEngine<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EngineOutput, EngineError>> + Send + 'static,
{
    async fn vectorize(&self, inputs: &[String]) -> Result<EngineOutput, EngineError> {
        (self.f)(inputs.to_vec()).await
    }
}

impl<F> std::fmt::Debug for FnEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEngine").finish_non_exhaustive()
    }
}

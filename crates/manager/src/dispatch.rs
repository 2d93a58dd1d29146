use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{Instrument, debug, debug_span, error, warn};
use vecbatch_engine::VectorEngine;

use crate::batcher::Batch;
use crate::metrics::ManagerMetrics;
use crate::store::{Outcome, ResultStore};

/// What one [`dispatch`] run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Waves started.
    pub waves: usize,
    /// Engine calls made.
    pub batches: usize,
    /// Engine calls that failed.
    pub failed_batches: usize,
    /// Inputs that got a vector.
    pub delivered: usize,
    /// Inputs the engine answered without a usable vector.
    pub malformed: usize,
}

/// Per-batch tally, folded into the [`DispatchSummary`].
#[derive(Debug, Default)]
struct BatchResult {
    failed: bool,
    delivered: usize,
    malformed: usize,
}

/// Send `batches` to `engine` in waves of at most `max_parallel` concurrent
/// calls and write every input's outcome into `store`.
///
/// A wave is awaited in full before the next one starts, so a short wave
/// never pulls work forward from the next. Outcomes are written by request
/// identity, which keeps them correct whatever order concurrent calls finish
/// in. A `max_parallel` of zero is treated as one.
pub async fn dispatch(
    batches: Vec<Batch>,
    engine: &dyn VectorEngine,
    max_parallel: usize,
    store: &ResultStore,
    metrics: &ManagerMetrics,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for (wave_idx, wave) in batches.chunks(max_parallel.max(1)).enumerate() {
        metrics.increment_waves();
        summary.waves += 1;
        debug!(wave = wave_idx, batches = wave.len(), "dispatching wave");

        let results = join_all(wave.iter().enumerate().map(|(batch_idx, batch)| {
            run_batch(batch, engine, store, metrics)
                .instrument(debug_span!("vecbatch.batch", wave = wave_idx, batch = batch_idx))
        }))
        .await;

        for result in results {
            summary.batches += 1;
            summary.failed_batches += usize::from(result.failed);
            summary.delivered += result.delivered;
            summary.malformed += result.malformed;
        }
    }

    summary
}

async fn run_batch(
    batch: &Batch,
    engine: &dyn VectorEngine,
    store: &ResultStore,
    metrics: &ManagerMetrics,
) -> BatchResult {
    debug!(
        inputs = batch.len(),
        total_chars = batch.total_chars,
        "calling engine"
    );

    metrics.call_started();
    let response = AssertUnwindSafe(engine.vectorize(&batch.texts))
        .catch_unwind()
        .await;
    metrics.call_finished();

    let mut result = BatchResult::default();
    let Ok(response) = response else {
        // Slots are dropped unwritten; their owners see a closed slot.
        metrics.increment_engine_failures();
        error!(inputs = batch.len(), "engine call panicked");
        result.failed = true;
        for &id in &batch.ids {
            store.discard(id);
        }
        return result;
    };

    match response {
        Err(e) => {
            metrics.increment_engine_failures();
            warn!(inputs = batch.len(), error = %e, "engine call failed");
            result.failed = true;
            for &id in &batch.ids {
                store.resolve(id, Outcome::Failure(e.clone()));
            }
        }
        Ok(output) => {
            let mut entries = output.into_iter();
            for &id in &batch.ids {
                match entries.next().flatten() {
                    Some(vector) => {
                        result.delivered += 1;
                        store.resolve(id, Outcome::Success(vector));
                    }
                    None => {
                        result.malformed += 1;
                        store.resolve(id, Outcome::Malformed);
                    }
                }
            }
            if result.malformed > 0 {
                warn!(
                    inputs = batch.len(),
                    malformed = result.malformed,
                    "engine response is missing vectors"
                );
            }
        }
    }

    metrics.add_delivered(result.delivered as u64);
    metrics.add_malformed(result.malformed as u64);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use vecbatch_engine::{
        EngineError, EngineOutput, FailingVectorEngine, FixedVectorEngine, engine_fn,
    };

    use crate::batcher::split;
    use crate::store::{OutcomeSlot, RequestId};

    fn register(store: &ResultStore, count: RequestId) -> Vec<OutcomeSlot> {
        (0..count).map(|id| store.register(id)).collect()
    }

    fn batches_of(sizes: &[usize]) -> Vec<Batch> {
        let mut next: RequestId = 0;
        sizes
            .iter()
            .map(|&size| {
                let mut batch = Batch::default();
                for _ in 0..size {
                    batch.ids.push(next);
                    batch.texts.push(format!("t{next}"));
                    batch.total_chars += 2;
                    next += 1;
                }
                batch
            })
            .collect()
    }

    async fn outcomes(slots: Vec<OutcomeSlot>) -> Vec<Option<Outcome>> {
        join_all(slots.into_iter().map(OutcomeSlot::wait)).await
    }

    #[tokio::test]
    async fn every_input_gets_its_vector() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let slots = register(&store, 3);
        let engine = FixedVectorEngine::new(vec![0.1, 0.2]);

        let summary = dispatch(batches_of(&[2, 1]), &engine, 10, &store, &metrics).await;

        assert_eq!(summary.waves, 1);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.delivered, 3);
        for outcome in outcomes(slots).await {
            assert_eq!(outcome, Some(Outcome::Success(vec![0.1, 0.2])));
        }
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waves_respect_parallel_ceiling() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let slots = register(&store, 5);
        let engine =
            FixedVectorEngine::new(vec![1.0]).with_delay(Duration::from_millis(20));

        let summary = dispatch(batches_of(&[1, 1, 1, 1, 1]), &engine, 2, &store, &metrics).await;

        assert_eq!(summary.waves, 3);
        assert_eq!(summary.batches, 5);
        assert_eq!(engine.peak_in_flight(), 2);
        assert_eq!(metrics.snapshot().peak_in_flight_calls, 2);
        assert!(outcomes(slots).await.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn zero_parallelism_still_dispatches() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let _slots = register(&store, 2);
        let engine = FixedVectorEngine::new(vec![1.0]);

        let summary = dispatch(batches_of(&[1, 1]), &engine, 0, &store, &metrics).await;
        assert_eq!(summary.waves, 2);
    }

    #[tokio::test]
    async fn failure_fans_out_to_whole_batch() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let slots = register(&store, 2);

        let summary = dispatch(batches_of(&[2]), &FailingVectorEngine, 1, &store, &metrics).await;

        assert_eq!(summary.failed_batches, 1);
        let expected = Outcome::Failure(EngineError::ApiError("mock failure".to_owned()));
        for outcome in outcomes(slots).await {
            assert_eq!(outcome.as_ref(), Some(&expected));
        }
        assert_eq!(metrics.snapshot().engine_failures, 1);
    }

    #[tokio::test]
    async fn panicking_batch_releases_its_slots_only() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let slots = register(&store, 3);
        let engine = engine_fn(|inputs: Vec<String>| async move {
            assert!(!inputs.iter().any(|s| s == "t1"), "engine blew up");
            Ok::<EngineOutput, EngineError>(inputs.iter().map(|_| Some(vec![1.0])).collect())
        });

        let summary = dispatch(batches_of(&[1, 1, 1]), &engine, 3, &store, &metrics).await;

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.delivered, 2);
        assert_eq!(
            outcomes(slots).await,
            vec![
                Some(Outcome::Success(vec![1.0])),
                None,
                Some(Outcome::Success(vec![1.0])),
            ]
        );
        assert_eq!(store.pending(), 0);

        let snap = metrics.snapshot();
        assert_eq!(snap.engine_failures, 1);
        assert_eq!(snap.in_flight_calls, 0);
    }

    #[tokio::test]
    async fn short_or_empty_entries_are_malformed() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let slots = register(&store, 3);
        let engine = engine_fn(|_inputs: Vec<String>| async move {
            Ok::<EngineOutput, EngineError>(vec![None, Some(vec![2.0])])
        });

        let summary = dispatch(batches_of(&[3]), &engine, 1, &store, &metrics).await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.malformed, 2);
        assert_eq!(
            outcomes(slots).await,
            vec![
                Some(Outcome::Malformed),
                Some(Outcome::Success(vec![2.0])),
                Some(Outcome::Malformed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_completion_keeps_assignment() {
        let store = ResultStore::new();
        let metrics = ManagerMetrics::default();
        let texts = ["aa", "bb", "cc", "dd", "ee", "ff"];
        let slots = register(&store, 6);
        let items = texts.iter().zip(0..).map(|(t, id)| (id, (*t).to_owned()));

        // Earlier batches finish later, and each vector encodes its input.
        let engine = engine_fn(|inputs: Vec<String>| async move {
            let first = inputs.first().map_or(0, |s| s.as_bytes()[0]);
            let delay = u64::from(b'z' - first);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<EngineOutput, EngineError>(
                inputs
                    .iter()
                    .map(|s| Some(vec![f32::from(s.as_bytes()[0])]))
                    .collect(),
            )
        });

        dispatch(split(items, 4), &engine, 10, &store, &metrics).await;

        let got = outcomes(slots).await;
        for (text, outcome) in texts.iter().zip(got) {
            assert_eq!(
                outcome,
                Some(Outcome::Success(vec![f32::from(text.as_bytes()[0])]))
            );
        }
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking queueing and dispatch behaviour.
///
/// All counters use relaxed ordering except the in-flight gauge, which must
/// stay exact for the peak. For a point-in-time view, call
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ManagerMetrics {
    /// Requests accepted by `create`.
    pub requests_enqueued: AtomicU64,
    /// Queue snapshots handed to the dispatch pipeline.
    pub flushes: AtomicU64,
    /// Debounce expiries that found a flush still running.
    pub timer_reschedules: AtomicU64,
    /// Dispatch waves started.
    pub waves_dispatched: AtomicU64,
    /// Engine calls started.
    pub batches_dispatched: AtomicU64,
    /// Engine calls that failed.
    pub engine_failures: AtomicU64,
    /// Inputs the engine answered without a usable vector.
    pub malformed_results: AtomicU64,
    /// Vectors written to result slots.
    pub vectors_delivered: AtomicU64,
    /// Engine calls currently outstanding.
    pub in_flight_calls: AtomicU64,
    /// Highest value `in_flight_calls` has reached.
    pub peak_in_flight_calls: AtomicU64,
}

impl ManagerMetrics {
    /// Increment the enqueued request counter.
    pub fn increment_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the flush counter.
    pub fn increment_flushes(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the timer reschedule counter.
    pub fn increment_reschedules(&self) {
        self.timer_reschedules.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the wave counter.
    pub fn increment_waves(&self) {
        self.waves_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the engine failure counter.
    pub fn increment_engine_failures(&self) {
        self.engine_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the malformed result counter.
    pub fn add_malformed(&self, count: u64) {
        self.malformed_results.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to the delivered vector counter.
    pub fn add_delivered(&self, count: u64) {
        self.vectors_delivered.fetch_add(count, Ordering::Relaxed);
    }

    /// Record the start of an engine call.
    pub fn call_started(&self) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight_calls.fetch_max(now, Ordering::SeqCst);
    }

    /// Record the end of an engine call.
    pub fn call_finished(&self) {
        self.in_flight_calls.fetch_sub(1, Ordering::SeqCst);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> ManagerMetricsSnapshot {
        ManagerMetricsSnapshot {
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            timer_reschedules: self.timer_reschedules.load(Ordering::Relaxed),
            waves_dispatched: self.waves_dispatched.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            engine_failures: self.engine_failures.load(Ordering::Relaxed),
            malformed_results: self.malformed_results.load(Ordering::Relaxed),
            vectors_delivered: self.vectors_delivered.load(Ordering::Relaxed),
            in_flight_calls: self.in_flight_calls.load(Ordering::SeqCst),
            peak_in_flight_calls: self.peak_in_flight_calls.load(Ordering::SeqCst),
        }
    }
}

/// A plain data snapshot of [`ManagerMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerMetricsSnapshot {
    /// Requests accepted by `create`.
    pub requests_enqueued: u64,
    /// Queue snapshots handed to the dispatch pipeline.
    pub flushes: u64,
    /// Debounce expiries that found a flush still running.
    pub timer_reschedules: u64,
    /// Dispatch waves started.
    pub waves_dispatched: u64,
    /// Engine calls started.
    pub batches_dispatched: u64,
    /// Engine calls that failed.
    pub engine_failures: u64,
    /// Inputs the engine answered without a usable vector.
    pub malformed_results: u64,
    /// Vectors written to result slots.
    pub vectors_delivered: u64,
    /// Engine calls currently outstanding.
    pub in_flight_calls: u64,
    /// Highest number of simultaneously outstanding engine calls.
    pub peak_in_flight_calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = ManagerMetrics::default();
        assert_eq!(m.snapshot(), ManagerMetricsSnapshot::default());
    }

    #[test]
    fn increment_and_snapshot() {
        let m = ManagerMetrics::default();
        m.increment_enqueued();
        m.increment_enqueued();
        m.increment_flushes();
        m.increment_reschedules();
        m.increment_waves();
        m.increment_engine_failures();
        m.add_malformed(3);
        m.add_delivered(2);

        let snap = m.snapshot();
        assert_eq!(snap.requests_enqueued, 2);
        assert_eq!(snap.flushes, 1);
        assert_eq!(snap.timer_reschedules, 1);
        assert_eq!(snap.waves_dispatched, 1);
        assert_eq!(snap.engine_failures, 1);
        assert_eq!(snap.malformed_results, 3);
        assert_eq!(snap.vectors_delivered, 2);
    }

    #[test]
    fn peak_tracks_overlapping_calls() {
        let m = ManagerMetrics::default();
        m.call_started();
        m.call_started();
        m.call_finished();
        m.call_started();
        m.call_finished();
        m.call_finished();

        let snap = m.snapshot();
        assert_eq!(snap.batches_dispatched, 3);
        assert_eq!(snap.in_flight_calls, 0);
        assert_eq!(snap.peak_in_flight_calls, 2);
    }
}

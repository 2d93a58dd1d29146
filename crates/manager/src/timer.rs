//! Two-stage debounce timer.
//!
//! Armed by the first enqueue after the queue went idle. After
//! `fast_queue_ms` it flushes a lone request right away, keeps re-sleeping
//! while an earlier flush is still dispatching, and otherwise waits out the
//! rest of `wait_queue_ms` before flushing whatever has accumulated.

use std::sync::Arc;

use tracing::{Instrument, debug, debug_span};

use crate::manager::Shared;
use crate::queue::FastExpiry;

/// Start the debounce timer for `shared`.
///
/// Must only be called by the enqueue that armed the timer.
pub(crate) fn spawn(shared: Arc<Shared>) {
    tokio::spawn(run(shared).instrument(debug_span!("vecbatch.debounce")));
}

async fn run(shared: Arc<Shared>) {
    loop {
        let fast = shared.config().fast_queue_time();
        tokio::time::sleep(fast).await;

        match shared.queue.on_fast_expiry() {
            FastExpiry::Reschedule => {
                shared.metrics.increment_reschedules();
                debug!("previous flush still running, re-arming fast timer");
            }
            FastExpiry::Flush(flush) => {
                debug!("fast timer expired, flushing");
                shared.flush(flush).await;
                return;
            }
            FastExpiry::Extend => break,
        }
    }

    let extend = shared.config().extend_time();
    debug!(
        queued = shared.queue.len(),
        extend = ?extend,
        "burst detected, extending debounce"
    );
    tokio::time::sleep(extend).await;

    let flush = shared.queue.take_for_flush();
    shared.flush(flush).await;
}

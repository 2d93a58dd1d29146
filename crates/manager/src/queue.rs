use parking_lot::Mutex;

use crate::store::RequestId;

/// A request waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Identity of the originating `create` call.
    pub id: RequestId,
    /// Input string, before truncation.
    pub text: String,
}

/// What the debounce timer should do when its short stage expires.
#[derive(Debug)]
pub enum FastExpiry<'a> {
    /// A flush is still running; sleep the short stage again.
    Reschedule,
    /// At most one request is queued; flush it now.
    Flush(Flush<'a>),
    /// A burst is building up; wait the extended stage before flushing.
    Extend,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<PendingRequest>,
    timer_armed: bool,
    flushes_in_progress: usize,
}

/// The shared list of pending requests plus the debounce bookkeeping.
///
/// Queue contents, the "timer armed" flag and the in-progress flush count
/// live behind one mutex so that the at-most-one-timer rule holds even when
/// many callers enqueue from different threads.
#[derive(Debug, Default)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
}

impl RequestQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request.
    ///
    /// Returns `true` when no timer was armed; the caller must then start
    /// one. Every other concurrent caller gets `false`.
    pub fn enqueue(&self, request: PendingRequest) -> bool {
        let mut state = self.state.lock();
        state.pending.push(request);
        if state.timer_armed {
            false
        } else {
            state.timer_armed = true;
            true
        }
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether no request is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Whether a debounce timer is currently armed.
    pub fn timer_armed(&self) -> bool {
        self.state.lock().timer_armed
    }

    /// Number of flushes whose dispatch has not finished yet.
    pub fn flushes_in_progress(&self) -> usize {
        self.state.lock().flushes_in_progress
    }

    /// Decide the outcome of the short debounce stage.
    pub fn on_fast_expiry(&self) -> FastExpiry<'_> {
        let mut state = self.state.lock();
        if state.flushes_in_progress > 0 {
            FastExpiry::Reschedule
        } else if state.pending.len() <= 1 {
            FastExpiry::Flush(self.begin_flush(&mut state))
        } else {
            FastExpiry::Extend
        }
    }

    /// Snapshot and clear the queue, disarm the timer and mark a flush as in
    /// progress until the returned [`Flush`] is dropped.
    pub fn take_for_flush(&self) -> Flush<'_> {
        let mut state = self.state.lock();
        self.begin_flush(&mut state)
    }

    fn begin_flush(&self, state: &mut QueueState) -> Flush<'_> {
        state.timer_armed = false;
        state.flushes_in_progress += 1;
        Flush {
            queue: self,
            requests: std::mem::take(&mut state.pending),
        }
    }

    fn finish_flush(&self) {
        let mut state = self.state.lock();
        state.flushes_in_progress = state.flushes_in_progress.saturating_sub(1);
    }
}

/// A queue snapshot taken for dispatch.
///
/// The flush counts as in progress until this value is dropped, including
/// when the dispatching task unwinds.
#[derive(Debug)]
pub struct Flush<'a> {
    queue: &'a RequestQueue,
    requests: Vec<PendingRequest>,
}

impl Flush<'_> {
    /// Requests captured by this flush, in enqueue order.
    pub fn requests(&self) -> &[PendingRequest] {
        &self.requests
    }

    /// Move the captured requests out, leaving the flush marked in progress.
    pub fn take_requests(&mut self) -> Vec<PendingRequest> {
        std::mem::take(&mut self.requests)
    }
}

impl Drop for Flush<'_> {
    fn drop(&mut self) {
        self.queue.finish_flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: RequestId) -> PendingRequest {
        PendingRequest {
            id,
            text: format!("r{id}"),
        }
    }

    #[test]
    fn only_first_enqueue_arms_timer() {
        let queue = RequestQueue::new();
        assert!(queue.enqueue(request(0)));
        assert!(!queue.enqueue(request(1)));
        assert!(!queue.enqueue(request(2)));
        assert!(queue.timer_armed());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn take_clears_queue_and_disarms_timer() {
        let queue = RequestQueue::new();
        queue.enqueue(request(0));
        queue.enqueue(request(1));

        let flush = queue.take_for_flush();
        let ids: Vec<RequestId> = flush.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(queue.is_empty());
        assert!(!queue.timer_armed());
        assert_eq!(queue.flushes_in_progress(), 1);

        // A new enqueue during the flush arms a fresh timer.
        assert!(queue.enqueue(request(2)));

        drop(flush);
        assert_eq!(queue.flushes_in_progress(), 0);
    }

    #[test]
    fn single_request_flushes_on_fast_expiry() {
        let queue = RequestQueue::new();
        queue.enqueue(request(0));
        match queue.on_fast_expiry() {
            FastExpiry::Flush(flush) => assert_eq!(flush.requests().len(), 1),
            other => panic!("expected flush, got {other:?}"),
        }
        assert_eq!(queue.flushes_in_progress(), 0);
    }

    #[test]
    fn burst_extends_on_fast_expiry() {
        let queue = RequestQueue::new();
        queue.enqueue(request(0));
        queue.enqueue(request(1));
        assert!(matches!(queue.on_fast_expiry(), FastExpiry::Extend));
        assert_eq!(queue.len(), 2);
        assert!(queue.timer_armed());
    }

    #[test]
    fn running_flush_forces_reschedule() {
        let queue = RequestQueue::new();
        queue.enqueue(request(0));
        let mut running = queue.take_for_flush();
        let _ = running.take_requests();

        queue.enqueue(request(1));
        assert!(matches!(queue.on_fast_expiry(), FastExpiry::Reschedule));

        drop(running);
        assert!(matches!(queue.on_fast_expiry(), FastExpiry::Flush(_)));
    }
}

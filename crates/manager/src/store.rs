use dashmap::DashMap;
use tokio::sync::oneshot;
use vecbatch_engine::{EngineError, Vector};

/// Identity of one `create` call. Never reused within a manager.
pub type RequestId = u64;

/// Final state of a request.
///
/// "Pending" is not a variant: a request is pending while its slot is still
/// registered in the [`ResultStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The engine produced a vector for this input.
    Success(Vector),
    /// The engine call covering this input failed.
    Failure(EngineError),
    /// The engine answered without a usable entry at this input's position.
    Malformed,
}

/// Write-once outcome slots keyed by request identity.
///
/// [`register`](Self::register) hands the caller the receiving half; the
/// dispatch path later writes through [`resolve`](Self::resolve), which
/// removes the slot so a second write for the same id is a no-op.
#[derive(Debug, Default)]
pub struct ResultStore {
    slots: DashMap<RequestId, oneshot::Sender<Outcome>>,
}

impl ResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for `id` and return the handle its owner waits on.
    pub fn register(&self, id: RequestId) -> OutcomeSlot {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(id, tx);
        OutcomeSlot { id, rx }
    }

    /// Write the outcome for `id`.
    ///
    /// Returns `false` if the slot was already written or discarded, or the
    /// owner stopped waiting.
    pub fn resolve(&self, id: RequestId, outcome: Outcome) -> bool {
        match self.slots.remove(&id) {
            Some((_, tx)) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Drop the slot for `id` without writing it. The owner observes a
    /// closed slot.
    pub fn discard(&self, id: RequestId) {
        self.slots.remove(&id);
    }

    /// Whether `id` still waits for its outcome.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of slots not yet written.
    pub fn pending(&self) -> usize {
        self.slots.len()
    }
}

/// The owning caller's side of a result slot.
#[derive(Debug)]
pub struct OutcomeSlot {
    id: RequestId,
    rx: oneshot::Receiver<Outcome>,
}

impl OutcomeSlot {
    /// Identity of the request this slot belongs to.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Suspend until the outcome is written.
    ///
    /// Returns `None` if the slot was discarded or the store was dropped.
    pub async fn wait(self) -> Option<Outcome> {
        self.rx.await.ok()
    }
}

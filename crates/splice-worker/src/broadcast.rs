//! In-process progress fan-out.
//!
//! Each observer owns a bounded channel. Publishing never waits on an
//! observer: a closed or full channel gets its observer removed from the
//! set, and the rest still receive the event.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use splice_models::ProgressEvent;

use crate::metrics;

/// Default per-observer buffer.
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

/// Handle identifying one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receiving end handed to an observer by [`ProgressBroadcaster::subscribe`].
///
/// Dropping it is equivalent to disconnecting; the observer is pruned on the
/// next publish.
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    rx: mpsc::Receiver<ProgressEvent>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next event; `None` once the observer has been removed and drained.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Next already-buffered event, without waiting.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }
}

/// Set of progress observers shared by every job.
#[derive(Debug)]
pub struct ProgressBroadcaster {
    observers: RwLock<HashMap<ObserverId, mpsc::Sender<ProgressEvent>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}

impl ProgressBroadcaster {
    /// Create a broadcaster buffering up to `buffer` events per observer.
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new observer.
    pub async fn subscribe(&self) -> Subscription {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.buffer);
        self.observers.write().await.insert(id, tx);
        debug!("Registered {}", id);
        Subscription { id, rx }
    }

    /// Remove an observer. Returns false if it was already gone.
    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            debug!("Unregistered {}", id);
        }
        removed
    }

    /// Deliver `event` to every current observer; returns how many received it.
    pub async fn publish(&self, event: ProgressEvent) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let observers = self.observers.read().await;
            for (id, tx) in observers.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Closed(_)) => {
                        debug!("{} disconnected", id);
                        failed.push(*id);
                    }
                    Err(TrySendError::Full(_)) => {
                        warn!("{} stopped draining its buffer, dropping it", id);
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &failed {
                observers.remove(id);
            }
            metrics::record_observers_dropped(failed.len());
        }

        delivered
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

//! Sync Facade
//!
//! Holds the materialized list for one collection and the strategy that
//! currently backs it. The UI reads snapshots; only the facade replaces
//! them.
//!
//! Every activation bumps a generation counter under the facade's lock and
//! aborts the previous listener. Snapshots and write results carry the
//! generation they were produced under and are dropped if it is no longer
//! current, so a late callback from an old session can never overwrite the
//! new session's state.

use std::sync::{Arc, Weak};

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::Binding;
use crate::domain::Record;
use crate::error::{SyncError, SyncResult};
use crate::repository::{RecordStream, StorageStrategy, SyncMode, WriteOutcome};

/// Point-in-time view of a collection
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Arc<Vec<T>>,
    /// True until the active strategy delivers its first snapshot
    pub loading: bool,
    /// `None` until a session has resolved
    pub mode: Option<SyncMode>,
}

impl<T> Snapshot<T> {
    fn pending(mode: Option<SyncMode>) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            loading: true,
            mode,
        }
    }
}

struct Active<T: Record> {
    generation: u64,
    binding: Option<Binding>,
    strategy: Option<Arc<dyn StorageStrategy<T>>>,
    listener: Option<JoinHandle<()>>,
}

struct Inner<T: Record> {
    state: watch::Sender<Snapshot<T>>,
    active: Mutex<Active<T>>,
}

impl<T: Record> Inner<T> {
    /// Replace the snapshot if `generation` is still current
    fn publish(&self, generation: u64, items: Arc<Vec<T>>) -> bool {
        let active = self.active.lock();
        if active.generation != generation {
            tracing::debug!(
                collection = T::COLLECTION,
                generation,
                current = active.generation,
                "dropping stale snapshot"
            );
            return false;
        }
        let mode = active.strategy.as_ref().map(|s| s.mode());
        self.state.send_replace(Snapshot {
            items,
            loading: false,
            mode,
        });
        true
    }
}

impl<T: Record> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.active.get_mut().listener.take() {
            listener.abort();
        }
    }
}

pub struct SyncFacade<T: Record> {
    inner: Arc<Inner<T>>,
}

impl<T: Record> Default for SyncFacade<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> SyncFacade<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot::pending(None));
        Self {
            inner: Arc::new(Inner {
                state,
                active: Mutex::new(Active {
                    generation: 0,
                    binding: None,
                    strategy: None,
                    listener: None,
                }),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.state.borrow().clone()
    }

    /// Change notifications for the snapshot
    pub fn watch(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.state.subscribe()
    }

    pub fn items(&self) -> Arc<Vec<T>> {
        self.inner.state.borrow().items.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn mode(&self) -> Option<SyncMode> {
        self.inner.state.borrow().mode
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.inner.state.borrow().items.iter().find(|r| r.id() == id).cloned()
    }

    pub fn is_bound_to(&self, binding: &Binding) -> bool {
        self.inner.active.lock().binding.as_ref() == Some(binding)
    }

    /// Switch to `strategy`.
    ///
    /// The previous listener is cancelled before the new subscription opens.
    /// If the subscription cannot be opened the facade is left unbound.
    /// A strategy whose first snapshot is ready immediately (local storage)
    /// is published before this returns. Must be called within a Tokio
    /// runtime.
    pub fn activate(&self, binding: Binding, strategy: Arc<dyn StorageStrategy<T>>) -> SyncResult<()> {
        let generation = self.invalidate(Some(binding), Some(strategy.clone()));
        tracing::info!(
            collection = T::COLLECTION,
            mode = ?strategy.mode(),
            generation,
            "storage mode activated"
        );

        let mut stream = match strategy.subscribe() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(collection = T::COLLECTION, error = %e, "failed to open subscription");
                self.invalidate(None, None);
                return Err(e);
            }
        };

        match stream.next().now_or_never() {
            Some(Some(Ok(items))) => {
                self.inner.publish(generation, Arc::new(items));
            }
            Some(Some(Err(e))) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "subscription error");
            }
            Some(None) => return Ok(()),
            None => {}
        }

        let listener = tokio::spawn(forward(Arc::downgrade(&self.inner), generation, stream));
        let mut active = self.inner.active.lock();
        if active.generation == generation {
            active.listener = Some(listener);
        } else {
            listener.abort();
        }
        Ok(())
    }

    /// The active strategy's current contents, read past the snapshot.
    /// Remote writes that the subscription has not reported yet are included.
    pub async fn list(&self) -> SyncResult<Vec<T>> {
        let (_, strategy) = self.current()?;
        strategy.list().await
    }

    /// Drop the current strategy and go back to the unresolved state
    pub fn deactivate(&self) {
        let generation = self.invalidate(None, None);
        tracing::debug!(collection = T::COLLECTION, generation, "storage mode deactivated");
    }

    fn invalidate(&self, binding: Option<Binding>, strategy: Option<Arc<dyn StorageStrategy<T>>>) -> u64 {
        let mut active = self.inner.active.lock();
        active.generation += 1;
        if let Some(listener) = active.listener.take() {
            listener.abort();
        }
        let mode = strategy.as_ref().map(|s| s.mode());
        active.binding = binding;
        active.strategy = strategy;
        self.inner.state.send_replace(Snapshot::pending(mode));
        active.generation
    }

    fn current(&self) -> SyncResult<(u64, Arc<dyn StorageStrategy<T>>)> {
        let active = self.inner.active.lock();
        active
            .strategy
            .clone()
            .map(|strategy| (active.generation, strategy))
            .ok_or(SyncError::NotReady)
    }

    fn apply(&self, generation: u64, outcome: WriteOutcome<T>) {
        if let WriteOutcome::Applied(items) = outcome {
            self.inner.publish(generation, items);
        }
    }

    /// In remote mode this returns once the store accepted the request; the
    /// record appears when the subscription reports it.
    pub async fn add(&self, draft: T::Draft) -> SyncResult<()> {
        let (generation, strategy) = self.current()?;
        let outcome = strategy.add(draft).await?;
        self.apply(generation, outcome);
        Ok(())
    }

    pub async fn update(&self, id: &str, patch: T::Patch) -> SyncResult<()> {
        let (generation, strategy) = self.current()?;
        let outcome = strategy.update(id, patch).await?;
        self.apply(generation, outcome);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        let (generation, strategy) = self.current()?;
        let outcome = strategy.delete(id).await?;
        self.apply(generation, outcome);
        Ok(())
    }
}

/// Feed subscription snapshots into the facade until the stream ends, the
/// facade is dropped or the generation moves on.
async fn forward<T: Record>(facade: Weak<Inner<T>>, generation: u64, mut stream: RecordStream<T>) {
    while let Some(next) = stream.next().await {
        let Some(inner) = facade.upgrade() else {
            break;
        };
        match next {
            Ok(items) => {
                tracing::debug!(collection = T::COLLECTION, count = items.len(), "snapshot received");
                if !inner.publish(generation, Arc::new(items)) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "subscription error");
            }
        }
    }
}

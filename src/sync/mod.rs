//! Sync Layer
//!
//! Per-entity stores that follow the session: local storage while signed
//! out, the signed-in user's live remote collections while signed in.
//! Local data is never migrated to the remote store.

mod facade;
mod habits;
mod tasks;


use std::sync::Arc;

pub use facade::{Snapshot, SyncFacade};
pub use habits::HabitStore;
pub use tasks::TaskStore;

use crate::auth::Session;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::domain::Record;
use crate::repository::{DocumentStore, LocalCollection, LocalStore, RemoteCollection, StorageStrategy};

/// What a facade is bound to for the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local,
    Remote { user_id: String },
}

impl Binding {
    /// `None` while the session is still loading
    pub fn for_session(session: &Session) -> Option<Self> {
        if session.loading {
            return None;
        }
        Some(match &session.user {
            Some(user) => Binding::Remote {
                user_id: user.uid.clone(),
            },
            None => Binding::Local,
        })
    }
}

/// Everything a store needs to build strategies
#[derive(Clone)]
pub struct StoreContext {
    pub local: LocalStore,
    pub documents: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<AppConfig>,
}

impl StoreContext {
    /// Strategy for `binding` with no query restrictions
    pub(crate) fn strategy<T: Record>(&self, binding: &Binding) -> Arc<dyn StorageStrategy<T>> {
        match binding {
            Binding::Local => Arc::new(LocalCollection::<T>::new(self.local.clone(), self.clock.clone())),
            Binding::Remote { user_id } => {
                Arc::new(RemoteCollection::<T>::new(self.documents.clone(), user_id.clone()))
            }
        }
    }
}

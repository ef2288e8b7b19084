//! Clarity Application
//!
//! Owns the session manager and both stores, and keeps the stores bound to
//! whatever the session currently is.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::auth::{IdentityProvider, Session, SessionManager};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::SyncResult;
use crate::repository::{DocumentStore, LocalStore};
use crate::sync::{HabitStore, StoreContext, TaskStore};

pub struct Clarity {
    config: Arc<AppConfig>,
    session: Arc<SessionManager>,
    tasks: Arc<TaskStore>,
    habits: Arc<HabitStore>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl Clarity {
    /// Open local storage, subscribe to the identity provider and start
    /// following the session. Must be called within a Tokio runtime.
    pub fn start(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
    ) -> SyncResult<Self> {
        Self::start_with_clock(config, identity, documents, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        init_logging(&config);

        let config = Arc::new(config);
        let ctx = StoreContext {
            local: LocalStore::open(&config)?,
            documents,
            clock,
            config: config.clone(),
        };
        let tasks = Arc::new(TaskStore::new(ctx.clone()));
        let habits = Arc::new(HabitStore::new(ctx));
        let session = Arc::new(SessionManager::start(identity));

        let follower = tokio::spawn(follow_session(session.clone(), tasks.clone(), habits.clone()));
        tracing::info!(app = %config.app_name, "started");

        Ok(Self {
            config,
            session,
            tasks,
            habits,
            follower: Mutex::new(Some(follower)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn habits(&self) -> &HabitStore {
        &self.habits
    }

    /// Stop following the session and close every subscription
    pub fn shutdown(&self) {
        if let Some(follower) = self.follower.lock().take() {
            follower.abort();
        }
        self.session.shutdown();
        self.tasks.unbind();
        self.habits.unbind();
        tracing::info!(app = %self.config.app_name, "shut down");
    }
}

impl Drop for Clarity {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.get_mut().take() {
            follower.abort();
        }
    }
}

fn init_logging(config: &AppConfig) {
    let Some(dir) = &config.log_dir else {
        return;
    };
    match rolling_logger::init_logger(dir, &config.app_name) {
        Ok(()) => {}
        Err(rolling_logger::LoggerError::AlreadyInitialized) => {
            tracing::debug!("rolling logger already installed");
        }
        Err(e) => tracing::warn!(error = %e, "failed to init rolling logger"),
    }
}

/// Rebind both stores on every session change
async fn follow_session(session: Arc<SessionManager>, tasks: Arc<TaskStore>, habits: Arc<HabitStore>) {
    let mut changes = session.watch();
    loop {
        let current = changes.borrow_and_update().clone();
        bind_all(&current, &tasks, &habits);
        if changes.changed().await.is_err() {
            break;
        }
    }
}

fn bind_all(session: &Session, tasks: &TaskStore, habits: &HabitStore) {
    if let Err(e) = tasks.bind(session) {
        tracing::error!(error = %e, "failed to bind tasks to session");
    }
    if let Err(e) = habits.bind(session) {
        tracing::error!(error = %e, "failed to bind habits to session");
    }
}

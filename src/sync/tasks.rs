//! Task Store

use std::sync::Arc;

use tokio::sync::watch;

use super::{Binding, Snapshot, StoreContext, SyncFacade};
use crate::auth::Session;
use crate::domain::{NewTask, Task, TaskPatch};
use crate::error::SyncResult;
use crate::repository::SyncMode;

pub struct TaskStore {
    facade: SyncFacade<Task>,
    ctx: StoreContext,
}

impl TaskStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            facade: SyncFacade::new(),
            ctx,
        }
    }

    /// Follow `session`. Returns whether the storage mode changed.
    pub fn bind(&self, session: &Session) -> SyncResult<bool> {
        let Some(binding) = Binding::for_session(session) else {
            return Ok(false);
        };
        if self.facade.is_bound_to(&binding) {
            return Ok(false);
        }
        let strategy = self.ctx.strategy::<Task>(&binding);
        self.facade.activate(binding, strategy)?;
        Ok(true)
    }

    pub fn unbind(&self) {
        self.facade.deactivate();
    }

    pub fn tasks(&self) -> Arc<Vec<Task>> {
        self.facade.items()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.facade.find(id)
    }

    pub fn loading(&self) -> bool {
        self.facade.loading()
    }

    pub fn mode(&self) -> Option<SyncMode> {
        self.facade.mode()
    }

    pub fn snapshot(&self) -> Snapshot<Task> {
        self.facade.snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot<Task>> {
        self.facade.watch()
    }

    pub async fn add(&self, task: NewTask) -> SyncResult<()> {
        tracing::debug!(title = task.title(), "adding task");
        self.facade.add(task).await
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> SyncResult<()> {
        self.facade.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        self.facade.delete(id).await
    }

    /// Flip completion. Unknown ids are ignored.
    ///
    /// Reads the task from storage rather than the snapshot, so a second
    /// toggle issued before the subscription catches up still flips back.
    pub async fn toggle(&self, id: &str) -> SyncResult<()> {
        let current = self.facade.list().await?;
        let Some(task) = current.into_iter().find(|t| t.id == id) else {
            return Ok(());
        };
        let patch = TaskPatch::toggle(&task, self.ctx.clock.now());
        self.facade.update(id, patch).await
    }
}

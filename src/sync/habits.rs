//! Habit Store
//!
//! Two collections bound together: habits and their daily logs. The remote
//! log subscription only covers the configured window (30 days by default);
//! local mode keeps every stored log.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde_json::json;
use tokio::sync::watch;

use super::{Binding, Snapshot, StoreContext, SyncFacade};
use crate::auth::Session;
use crate::domain::{Habit, HabitLog, HabitPatch, NewHabit, NewHabitLog};
use crate::error::SyncResult;
use crate::repository::{RemoteCollection, StorageStrategy, SyncMode};
use crate::streak;

pub struct HabitStore {
    habits: SyncFacade<Habit>,
    logs: SyncFacade<HabitLog>,
    ctx: StoreContext,
}

impl HabitStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            habits: SyncFacade::new(),
            logs: SyncFacade::new(),
            ctx,
        }
    }

    /// Follow `session`. Returns whether the storage mode changed.
    pub fn bind(&self, session: &Session) -> SyncResult<bool> {
        let Some(binding) = Binding::for_session(session) else {
            return Ok(false);
        };
        if self.habits.is_bound_to(&binding) && self.logs.is_bound_to(&binding) {
            return Ok(false);
        }

        let habits = self.ctx.strategy::<Habit>(&binding);
        let logs: Arc<dyn StorageStrategy<HabitLog>> = match &binding {
            Binding::Local => self.ctx.strategy::<HabitLog>(&binding),
            Binding::Remote { user_id } => Arc::new(
                RemoteCollection::<HabitLog>::new(self.ctx.documents.clone(), user_id.clone())
                    .with_lower_bound(HabitLog::DATE_FIELD, json!(self.window_start())),
            ),
        };
        self.switch(binding, habits, logs)?;
        Ok(true)
    }

    /// Move both collections to `binding`. On failure neither stays bound,
    /// so habits and logs never follow different sessions.
    pub(crate) fn switch(
        &self,
        binding: Binding,
        habits: Arc<dyn StorageStrategy<Habit>>,
        logs: Arc<dyn StorageStrategy<HabitLog>>,
    ) -> SyncResult<()> {
        if let Err(e) = self.habits.activate(binding.clone(), habits) {
            self.logs.deactivate();
            return Err(e);
        }
        if let Err(e) = self.logs.activate(binding, logs) {
            self.habits.deactivate();
            return Err(e);
        }
        Ok(())
    }

    pub fn unbind(&self) {
        self.habits.deactivate();
        self.logs.deactivate();
    }

    /// First day covered by the remote log subscription
    pub fn window_start(&self) -> NaiveDate {
        let today = self.ctx.clock.today();
        today
            .checked_sub_days(Days::new(u64::from(self.ctx.config.habit_log_window_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn habits(&self) -> Arc<Vec<Habit>> {
        self.habits.items()
    }

    pub fn logs(&self) -> Arc<Vec<HabitLog>> {
        self.logs.items()
    }

    /// Tracks the habit list; logs may still be arriving
    pub fn loading(&self) -> bool {
        self.habits.loading()
    }

    pub fn mode(&self) -> Option<SyncMode> {
        self.habits.mode()
    }

    pub fn watch_habits(&self) -> watch::Receiver<Snapshot<Habit>> {
        self.habits.watch()
    }

    pub fn watch_logs(&self) -> watch::Receiver<Snapshot<HabitLog>> {
        self.logs.watch()
    }

    /// Add a habit; color and icon fall back to the configured defaults
    pub async fn add_habit(&self, name: impl Into<String>, color: Option<&str>, icon: Option<&str>) -> SyncResult<()> {
        let config = &self.ctx.config;
        let habit = NewHabit {
            name: name.into(),
            color: color.unwrap_or(config.default_habit_color.as_str()).to_string(),
            icon: icon.unwrap_or(config.default_habit_icon.as_str()).to_string(),
        };
        tracing::debug!(name = %habit.name, "adding habit");
        self.habits.add(habit).await
    }

    pub async fn update_habit(&self, id: &str, patch: HabitPatch) -> SyncResult<()> {
        self.habits.update(id, patch).await
    }

    /// Logs of the deleted habit stay where they are
    pub async fn delete_habit(&self, id: &str) -> SyncResult<()> {
        self.habits.delete(id).await
    }

    /// Mark the habit done today, or undo it if it already is.
    ///
    /// The existing log is looked up in storage rather than the snapshot, so
    /// back-to-back toggles never leave two logs for one day.
    pub async fn toggle_log(&self, habit_id: &str) -> SyncResult<()> {
        let today = self.ctx.clock.today();
        let existing = self
            .logs
            .list()
            .await?
            .into_iter()
            .find(|log| log.is_for(habit_id, today))
            .map(|log| log.id);

        match existing {
            Some(id) => self.logs.delete(&id).await,
            None => {
                self.logs
                    .add(NewHabitLog {
                        habit_id: habit_id.to_string(),
                        log_date: today,
                    })
                    .await
            }
        }
    }

    pub fn is_done_today(&self, habit_id: &str) -> bool {
        streak::is_done_today(&self.logs.items(), habit_id, self.ctx.clock.today())
    }

    pub fn streak(&self, habit_id: &str) -> u32 {
        streak::streak(
            &self.logs.items(),
            habit_id,
            self.ctx.clock.today(),
            self.ctx.config.streak_lookback_days,
        )
    }
}

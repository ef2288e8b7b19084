//! Task Entity
//!
//! A to-do item that can be completed and reopened.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, InsertAt, Record, SortKey};

/// A single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (UUID locally, document id remotely)
    pub id: String,
    pub title: String,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Completion status
    #[serde(default)]
    pub completed: bool,
    /// Set when the task was last completed, cleared when reopened
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Owner; only present on remote documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Task {
    const COLLECTION: &'static str = "tasks";
    // Newest first, same as the remote ordering
    const INSERT_AT: InsertAt = InsertAt::Front;

    type Draft = NewTask;
    type Patch = TaskPatch;

    fn from_draft(id: String, created_at: DateTime<Utc>, draft: NewTask) -> Self {
        Self {
            id,
            title: draft.title,
            notes: draft.notes,
            due_date: draft.due_date,
            completed: draft.completed,
            completed_at: None,
            created_at,
            user_id: None,
        }
    }

    fn remote_order() -> Option<SortKey> {
        Some(SortKey::desc("createdAt"))
    }
}

/// Fields for a new task. New tasks always start open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<NaiveDate>,
    completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: None,
            due_date: None,
            completed: false,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Partial task update.
///
/// `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Patch flipping `task` to the other completion state at `now`
    pub fn toggle(task: &Task, now: DateTime<Utc>) -> Self {
        let completed = !task.completed;
        Self {
            completed: Some(completed),
            completed_at: Some(completed.then_some(now)),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Task {
        let created = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        Task::from_draft("t1".to_string(), created, NewTask::new("Write report"))
    }

    #[test]
    fn test_task_from_draft() {
        let task = sample();
        assert_eq!(task.id(), "t1");
        assert_eq!(task.title, "Write report");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(task.user_id.is_none());
    }

    #[test]
    fn test_toggle_patch_sets_and_clears_completed_at() {
        let now = Utc.with_ymd_and_hms(2026, 10, 20, 8, 30, 0).unwrap();
        let mut task = sample();

        let patch = TaskPatch::toggle(&task, now);
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.completed_at, Some(Some(now)));

        task.completed = true;
        let patch = TaskPatch::toggle(&task, now);
        assert_eq!(patch.completed, Some(false));
        assert_eq!(patch.completed_at, Some(None));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let value = serde_json::to_value(TaskPatch::title("Renamed")).unwrap();
        assert_eq!(value, serde_json::json!({ "title": "Renamed" }));

        let clear = TaskPatch {
            notes: Some(None),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(clear).unwrap(), serde_json::json!({ "notes": null }));
    }

    #[test]
    fn test_task_uses_camel_case_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("completedAt").is_some());
        assert!(value.get("userId").is_none());
    }

    #[test]
    fn test_new_task_draft_starts_open() {
        let value = serde_json::to_value(NewTask::new("Call mom")).unwrap();
        assert_eq!(value, serde_json::json!({ "title": "Call mom", "completed": false }));
    }
}

//! Habit and HabitLog Entities
//!
//! A habit is marked done for a calendar day by the presence of a log.
//! There is at most one log per (habit, day).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, Record, SortKey};

/// A habit being tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    /// Display color, e.g. `#c85a2a`
    pub color: String,
    /// Display icon, usually a single emoji
    pub icon: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Entity for Habit {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Habit {
    const COLLECTION: &'static str = "habits";

    type Draft = NewHabit;
    type Patch = HabitPatch;

    fn from_draft(id: String, created_at: DateTime<Utc>, draft: NewHabit) -> Self {
        Self {
            id,
            name: draft.name,
            color: draft.color,
            icon: draft.icon,
            created_at,
            user_id: None,
        }
    }

    fn remote_order() -> Option<SortKey> {
        Some(SortKey::asc("createdAt"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHabit {
    pub name: String,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HabitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One habit marked done on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLog {
    pub id: String,
    pub habit_id: String,
    /// Calendar day, serialized as `YYYY-MM-DD`
    pub log_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl HabitLog {
    /// Serialized name of `log_date`, used for the remote window bound
    pub const DATE_FIELD: &'static str = "logDate";

    pub fn is_for(&self, habit_id: &str, day: NaiveDate) -> bool {
        self.habit_id == habit_id && self.log_date == day
    }
}

impl Entity for HabitLog {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for HabitLog {
    const COLLECTION: &'static str = "habit_logs";

    type Draft = NewHabitLog;
    type Patch = HabitLogPatch;

    fn from_draft(id: String, _created_at: DateTime<Utc>, draft: NewHabitLog) -> Self {
        Self {
            id,
            habit_id: draft.habit_id,
            log_date: draft.log_date,
            user_id: None,
        }
    }

    fn created_at_field() -> Option<&'static str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabitLog {
    pub habit_id: String,
    pub log_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_date_serializes_as_calendar_day() {
        let log = HabitLog::from_draft(
            "l1".to_string(),
            Utc::now(),
            NewHabitLog {
                habit_id: "h1".to_string(),
                log_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            },
        );
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "id": "l1", "habitId": "h1", "logDate": "2026-10-19" })
        );
    }

    #[test]
    fn test_log_matches_habit_and_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let log = HabitLog {
            id: "l1".to_string(),
            habit_id: "h1".to_string(),
            log_date: day,
            user_id: None,
        };
        assert!(log.is_for("h1", day));
        assert!(!log.is_for("h2", day));
        assert!(!log.is_for("h1", day.pred_opt().unwrap()));
    }

    #[test]
    fn test_habit_reads_remote_document_shape() {
        let habit: Habit = serde_json::from_value(serde_json::json!({
            "id": "h1",
            "name": "Read",
            "color": "#c85a2a",
            "icon": "⭐",
            "createdAt": "2026-10-19T12:00:00.000000Z",
            "userId": "u1"
        }))
        .unwrap();
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.user_id.as_deref(), Some("u1"));
    }
}

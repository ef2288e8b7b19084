//! Domain Layer
//!
//! Contains the synced records and the traits every collection relies on.
//! This layer has NO storage dependencies (only serde and chrono).

mod entity;
mod habit;
mod task;

pub use entity::{Entity, InsertAt, Record, SortDirection, SortKey, OWNER_FIELD};
pub use habit::{Habit, HabitLog, HabitLogPatch, HabitPatch, NewHabit, NewHabitLog};
pub use task::{NewTask, Task, TaskPatch};

//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct, its on-disk record shape and
//! the one-line summary printed by the console.

use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{Priority, Status};

/// Display format for timestamps in the summary line.
const SUMMARY_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Number of id characters shown in listings.
pub const SHORT_ID_LEN: usize = 8;

/// A unit of work with identity, content, priority and completion state.
///
/// Completion is tracked by `completed_at` alone, so a task is completed
/// exactly when it carries a completion timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    /// Create a pending task with a fresh id, stamped with the current local time.
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: Priority) -> Self {
        Self::new_at(title, description, priority, Local::now().naive_local())
    }

    pub fn new_at(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        created_at: NaiveDateTime,
    ) -> Self {
        Task {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            priority,
            created_at,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn status(&self) -> Status {
        if self.is_completed() {
            Status::Completed
        } else {
            Status::Pending
        }
    }

    /// The id prefix shown in listings.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | [{}] {} - Priority: {} | Status: {} | Created: {}",
            self.short_id(),
            if self.is_completed() { "X" } else { " " },
            self.title,
            self.priority,
            self.status(),
            self.created_at.format(SUMMARY_TIME_FORMAT),
        )?;
        if let Some(done) = self.completed_at {
            write!(f, " | Completed: {}", done.format(SUMMARY_TIME_FORMAT))?;
        }
        Ok(())
    }
}

/// The JSON shape of a task as stored in the backing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "creationDate", alias = "creationTimestamp")]
    pub creation_date: NaiveDateTime,
    #[serde(
        rename = "completionDate",
        alias = "completionTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_date: Option<NaiveDateTime>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let completed_at = match (record.completed, record.completion_date) {
            (true, Some(at)) => Some(at),
            (true, None) => {
                tracing::warn!(id = %record.id, "completed task without completion date, using creation date");
                Some(record.creation_date)
            }
            (false, Some(_)) => {
                tracing::warn!(id = %record.id, "pending task carries a completion date, dropping it");
                None
            }
            (false, None) => None,
        };
        Task {
            id: record.id,
            title: record.title,
            description: record.description,
            priority: record.priority,
            created_at: record.creation_date,
            completed_at,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        TaskRecord {
            completed: task.is_completed(),
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            creation_date: task.created_at,
            completion_date: task.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("Buy milk", "2L whole milk", Priority::Medium);
        assert!(!task.is_completed());
        assert_eq!(task.status(), Status::Pending);
        assert!(task.completed_at.is_none());
        assert_eq!(task.id.len(), 36);
    }

    #[test]
    fn test_new_tasks_get_distinct_ids() {
        let a = Task::new("a", "a", Priority::Low);
        let b = Task::new("b", "b", Priority::Low);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_summary_line_pending() {
        let mut task = Task::new_at("Buy milk", "2L", Priority::Medium, at(9, 5));
        task.id = "1234abcd-0000-0000-0000-000000000000".into();
        assert_eq!(
            task.to_string(),
            "ID: 1234abcd | [ ] Buy milk - Priority: MEDIUM | Status: Pending | Created: 09/03/2024 09:05"
        );
    }

    #[test]
    fn test_summary_line_completed() {
        let mut task = Task::new_at("Ship it", "release", Priority::High, at(9, 5));
        task.id = "ffffeeee-0000-0000-0000-000000000000".into();
        task.completed_at = Some(at(17, 30));
        assert_eq!(
            task.to_string(),
            "ID: ffffeeee | [X] Ship it - Priority: HIGH | Status: Completed | Created: 09/03/2024 09:05 | Completed: 09/03/2024 17:30"
        );
    }

    #[test]
    fn test_short_id_of_short_value() {
        let mut task = Task::new("t", "d", Priority::Low);
        task.id = "abc".into();
        assert_eq!(task.short_id(), "abc");
    }

    #[test]
    fn test_record_field_names() {
        let task = Task::new_at("t", "d", Priority::Low, at(8, 0));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["completed"], false);
        assert_eq!(value["priority"], "LOW");
        assert_eq!(value["creationDate"], "2024-03-09T08:00:00");
        assert!(value.get("completionDate").is_none());
    }

    #[test]
    fn test_legacy_completed_without_date_uses_creation_date() {
        let json = r#"{"id":"x","title":"t","description":"d","priority":"ALTA",
            "completed":true,"creationDate":"2024-03-09T08:00:00"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.completed_at, Some(task.created_at));
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_pending_record_drops_stray_completion_date() {
        let json = r#"{"id":"x","title":"t","priority":"LOW","completed":false,
            "creationDate":"2024-03-09T08:00:00","completionDate":"2024-03-09T09:00:00"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.completed_at.is_none());
        assert_eq!(task.description, "");
    }
}

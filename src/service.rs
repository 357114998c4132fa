//! Task use-case service.
//!
//! Every change to the task list goes through `TaskService`, which applies
//! the business rules (required fields, partial updates, idempotent
//! completion, id resolution) before handing the result to the store.

use chrono::{Local, NaiveDateTime};
use thiserror::Error;

use crate::db::{Backend, StoreError, TaskStore};
use crate::fields::{Priority, ValidationPolicy};
use crate::task::Task;

pub type TaskResult<T> = Result<T, TaskError>;

/// Errors raised by task operations. None of them is fatal.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),
    #[error("task not found with id: {0}")]
    NotFound(String),
    #[error("id prefix '{prefix}' matches {matches} tasks, type more characters")]
    Ambiguous { prefix: String, matches: usize },
    #[error("changes kept in memory but not saved: {0}")]
    Persistence(#[from] StoreError),
}

/// Partial update request. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

/// Fields of an update that were ignored because they were blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredField {
    Title,
    Description,
}

/// The task as stored after an update, plus the blank fields that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub task: Task,
    pub ignored: Vec<IgnoredField>,
}

/// Result of completing a task, carrying its completion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed(NaiveDateTime),
    AlreadyCompleted(NaiveDateTime),
}

pub struct TaskService<B: Backend> {
    store: TaskStore<B>,
    policy: ValidationPolicy,
}

impl<B: Backend> TaskService<B> {
    pub fn new(store: TaskStore<B>, policy: ValidationPolicy) -> Self {
        TaskService { store, policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Create a pending task after checking the required fields.
    pub fn create_task(&mut self, title: &str, description: &str, priority: Priority) -> TaskResult<Task> {
        require(title, "Task title is required.")?;
        if self.policy.requires_description() {
            require(description, "Task description is required.")?;
        }

        let task = Task::new(title.trim(), description.trim(), priority);
        self.store.add(task.clone())?;
        tracing::info!(id = %task.id, "task created");
        Ok(task)
    }

    /// All tasks in insertion order.
    pub fn list_all_tasks(&self) -> Vec<Task> {
        self.store.find_all()
    }

    /// Apply a partial update to the task matching `id`.
    ///
    /// A blank title is never stored. A blank description is ignored under
    /// the strict policy and stored as given under the lenient one.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> TaskResult<UpdateOutcome> {
        let mut task = self.resolve(id)?;
        let mut ignored = Vec::new();

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                ignored.push(IgnoredField::Title);
            } else {
                task.title = title;
            }
        }
        if let Some(description) = update.description {
            if description.trim().is_empty() && self.policy.requires_description() {
                ignored.push(IgnoredField::Description);
            } else {
                task.description = description;
            }
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }

        if !self.store.update(&task)? {
            return Err(TaskError::NotFound(id.to_string()));
        }
        tracing::info!(id = %task.id, "task updated");
        Ok(UpdateOutcome { task, ignored })
    }

    /// Mark the task matching `id` as completed. Completing twice changes nothing.
    pub fn complete_task(&mut self, id: &str) -> TaskResult<Completion> {
        let mut task = self.resolve(id)?;
        if let Some(at) = task.completed_at {
            return Ok(Completion::AlreadyCompleted(at));
        }

        // Never earlier than creation, even if the clock moved backwards.
        let now = Local::now().naive_local().max(task.created_at);
        task.completed_at = Some(now);
        if !self.store.update(&task)? {
            return Err(TaskError::NotFound(id.to_string()));
        }
        tracing::info!(id = %task.id, "task completed");
        Ok(Completion::Completed(now))
    }

    /// Delete the task matching `id`, returning the removed task.
    pub fn remove_task(&mut self, id: &str) -> TaskResult<Task> {
        let task = self.resolve(id)?;
        if !self.store.remove(&task.id)? {
            return Err(TaskError::NotFound(id.to_string()));
        }
        tracing::info!(id = %task.id, "task removed");
        Ok(task)
    }

    /// Resolve a full id or an unambiguous id prefix to a task.
    pub fn resolve(&self, id: &str) -> TaskResult<Task> {
        let id = id.trim();
        if id.is_empty() {
            return Err(TaskError::NotFound(String::new()));
        }
        let mut matches = self.store.find_matching(id);
        if let Some(pos) = matches.iter().position(|t| t.id == id) {
            return Ok(matches.swap_remove(pos));
        }
        match matches.len() {
            0 => Err(TaskError::NotFound(id.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(TaskError::Ambiguous { prefix: id.to_string(), matches: n }),
        }
    }
}

fn require(value: &str, message: &str) -> TaskResult<()> {
    if value.trim().is_empty() {
        return Err(TaskError::Validation(message.to_string()));
    }
    Ok(())
}

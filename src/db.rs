//! Persistence store for tasks.
//!
//! `TaskStore` owns the authoritative in-memory task list and mirrors it to
//! a `Backend` after every mutation. The whole collection is written each
//! time; `JsonFile` keeps it in a single JSON document on disk and
//! `InMemory` keeps it nowhere, for tests.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use crate::task::Task;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while reading or writing the backing file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed task file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("saving is disabled: the task file could not be read or backed up")]
    Protected,
}

/// Whole-collection persistence.
pub trait Backend {
    /// Read every stored task. A missing store yields an empty list.
    fn load(&self) -> StoreResult<Vec<Task>>;
    /// Replace the stored collection with `tasks`.
    fn save(&self, tasks: &[Task]) -> StoreResult<()>;
    /// Keep a copy of unreadable contents before they get overwritten.
    fn preserve_damaged(&self) -> StoreResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// A JSON array of tasks in a single file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl Backend for JsonFile {
    fn load(&self) -> StoreResult<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut buf = String::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|e| self.io_err(e))?;
        if buf.trim().is_empty() {
            return Ok(Vec::new());
        }
        let tasks: Option<Vec<Task>> = serde_json::from_str(&buf)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;
        Ok(tasks.unwrap_or_default())
    }

    fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let data = serde_json::to_string_pretty(tasks)?;
        // Atomic-ish write via temp + rename.
        let tmp = self.path.with_extension("json.tmp");
        let write = || -> io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| self.io_err(e))
    }

    fn preserve_damaged(&self) -> StoreResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        create_backup(&self.path).map(Some).map_err(|e| self.io_err(e))
    }
}

/// Copy `path` into a sibling `backup/` directory under a timestamped name.
pub fn create_backup(path: &Path) -> io::Result<PathBuf> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tasks.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, file_name));

    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

/// Keeps tasks in memory only. Saves always succeed.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    seed: Vec<Task>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection, as if it had been on disk.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        InMemory { seed: tasks }
    }
}

impl Backend for InMemory {
    fn load(&self) -> StoreResult<Vec<Task>> {
        Ok(self.seed.clone())
    }

    fn save(&self, _tasks: &[Task]) -> StoreResult<()> {
        Ok(())
    }
}

/// Test backend whose saves always fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FailingSave;

#[cfg(test)]
impl Backend for FailingSave {
    fn load(&self) -> StoreResult<Vec<Task>> {
        Ok(Vec::new())
    }

    fn save(&self, _tasks: &[Task]) -> StoreResult<()> {
        Err(StoreError::Io {
            path: PathBuf::from("tasks.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

/// Test backend that cannot be read or backed up, and records every save.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Unreadable {
    pub saves: std::cell::Cell<usize>,
}

#[cfg(test)]
impl Backend for Unreadable {
    fn load(&self) -> StoreResult<Vec<Task>> {
        Err(StoreError::Io {
            path: PathBuf::from("tasks.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "no read access"),
        })
    }

    fn save(&self, _tasks: &[Task]) -> StoreResult<()> {
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn preserve_damaged(&self) -> StoreResult<Option<PathBuf>> {
        Err(StoreError::Io {
            path: PathBuf::from("backup"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "no read access"),
        })
    }
}

/// The in-memory task collection plus the backend that mirrors it.
#[derive(Debug)]
pub struct TaskStore<B: Backend> {
    backend: B,
    tasks: Vec<Task>,
    // Cleared when unreadable contents could not be copied aside.
    writable: bool,
}

impl<B: Backend> TaskStore<B> {
    /// Load the collection, starting empty when the backend cannot be read.
    ///
    /// Damaged contents are copied aside first so the next save does not
    /// destroy the only copy.
    pub fn open(backend: B) -> Self {
        match backend.load() {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "loaded tasks");
                TaskStore { backend, tasks, writable: true }
            }
            Err(e) => {
                tracing::error!("{e}; starting with an empty task list");
                let writable = match backend.preserve_damaged() {
                    Ok(Some(copy)) => {
                        tracing::warn!(backup = %copy.display(), "kept a copy of the unreadable task file");
                        true
                    }
                    Ok(None) => true,
                    Err(e) => {
                        tracing::error!("could not back up the unreadable task file, changes will not be saved: {e}");
                        false
                    }
                };
                TaskStore { backend, tasks: Vec::new(), writable }
            }
        }
    }

    /// Load the collection, failing instead of falling back to empty.
    pub fn load_strict(backend: B) -> StoreResult<Self> {
        let tasks = backend.load()?;
        Ok(TaskStore { backend, tasks, writable: true })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Append a task and persist the whole collection.
    pub fn add(&mut self, task: Task) -> StoreResult<()> {
        self.tasks.push(task);
        self.persist()
    }

    /// Delete the task whose id equals `id` exactly. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// First task, in insertion order, whose id starts with `prefix`.
    pub fn find_by_id(&self, prefix: &str) -> Option<Task> {
        self.tasks.iter().find(|t| t.id.starts_with(prefix)).cloned()
    }

    /// Every task whose id starts with `prefix`, in insertion order.
    pub fn find_matching(&self, prefix: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.id.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// A copy of the whole collection in insertion order.
    pub fn find_all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Replace the stored task with the same id and persist.
    /// Returns `false` when no task has that id.
    pub fn update(&mut self, task: &Task) -> StoreResult<bool> {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(false);
        };
        *slot = task.clone();
        self.persist()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether mutations are written through to the backend.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    // On failure the in-memory state stays ahead of the backend.
    fn persist(&self) -> StoreResult<()> {
        if !self.writable {
            return Err(StoreError::Protected);
        }
        self.backend.save(&self.tasks).inspect_err(|e| {
            tracing::error!("failed to save tasks: {e}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;

    fn task_with_id(id: &str, title: &str) -> Task {
        let mut t = Task::new(title, "desc", Priority::Low);
        t.id = id.to_string();
        t
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFile::new(dir.path().join("tasks.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = TaskStore::open(JsonFile::new(&path));
        store.add(Task::new("Buy milk", "2L whole milk", Priority::Medium)).unwrap();
        let mut done = Task::new("File taxes", "before April", Priority::High);
        done.completed_at = Some(done.created_at + chrono::Duration::minutes(5));
        store.add(done).unwrap();

        let reloaded = TaskStore::load_strict(JsonFile::new(&path)).unwrap();
        assert_eq!(reloaded.find_all(), store.find_all());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_is_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = TaskStore::open(JsonFile::new(&path));
        store.add(task_with_id("abc", "t")).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["id"], "abc");
    }

    #[test]
    fn test_malformed_file_is_backed_up_and_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            TaskStore::load_strict(JsonFile::new(&path)),
            Err(StoreError::Parse { .. })
        ));

        let store = TaskStore::open(JsonFile::new(&path));
        assert!(store.is_empty());
        let backups: Vec<_> = fs::read_dir(dir.path().join("backup")).unwrap().collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unbacked_damaged_file_is_never_overwritten() {
        let mut store = TaskStore::open(Unreadable::default());
        assert!(store.is_empty());
        assert!(!store.is_writable());

        let err = store.add(task_with_id("abc", "t")).unwrap_err();
        assert!(matches!(err, StoreError::Protected));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.remove("abc"), Err(StoreError::Protected)));
        assert_eq!(store.backend().saves.get(), 0);
    }

    #[test]
    fn test_missing_file_store_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(JsonFile::new(dir.path().join("tasks.json")));
        assert!(store.is_writable());
    }

    #[test]
    fn test_null_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "null").unwrap();
        assert!(JsonFile::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_save_failure_keeps_memory_ahead() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("tasks.json");
        let mut store = TaskStore::open(JsonFile::new(&path));
        let err = store.add(task_with_id("abc", "t")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_find_by_prefix_first_in_insertion_order() {
        let mut store = TaskStore::open(InMemory::new());
        store.add(task_with_id("ab12", "first")).unwrap();
        store.add(task_with_id("ab34", "second")).unwrap();
        store.add(task_with_id("cd56", "third")).unwrap();

        assert_eq!(store.find_by_id("ab").unwrap().title, "first");
        assert_eq!(store.find_by_id("ab3").unwrap().title, "second");
        assert!(store.find_by_id("zz").is_none());
        assert_eq!(store.find_matching("ab").len(), 2);
    }

    #[test]
    fn test_find_all_is_a_copy() {
        let mut store = TaskStore::open(InMemory::new());
        store.add(task_with_id("ab12", "first")).unwrap();
        let mut copy = store.find_all();
        copy[0].title = "changed".into();
        copy.clear();
        assert_eq!(store.find_all()[0].title, "first");
    }

    #[test]
    fn test_remove_requires_exact_id() {
        let mut store = TaskStore::open(InMemory::new());
        store.add(task_with_id("ab12", "first")).unwrap();
        assert!(!store.remove("ab").unwrap());
        assert!(store.remove("ab12").unwrap());
        assert!(store.find_by_id("ab12").is_none());
    }

    #[test]
    fn test_update_replaces_matching_entry() {
        let mut store = TaskStore::open(InMemory::new());
        store.add(task_with_id("ab12", "first")).unwrap();
        let mut task = store.find_by_id("ab12").unwrap();
        task.title = "renamed".into();
        assert!(store.update(&task).unwrap());
        assert_eq!(store.find_by_id("ab12").unwrap().title, "renamed");

        let stranger = task_with_id("zz99", "other");
        assert!(!store.update(&stranger).unwrap());
        assert_eq!(store.len(), 1);
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::{Category, HistoryAction, Priority, Status, Task, TaskHistory};
use crate::view::ViewType;

const TASKS_FILE: &str = "tasks.data";
const CATEGORIES_FILE: &str = "categories.data";
const HISTORY_FILE: &str = "history.data";
const PREFERENCES_FILE: &str = "preferences.data";

/// Per-user display and focus preferences. Serialized in the same camelCase
/// shape as the task records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: u64,
    pub default_view: ViewType,
    pub show_completed_tasks: bool,
    pub focus_mode_enabled: bool,
    pub focus_mode_duration: u32,
    pub theme: String,
    /// The task a running focus session is currently presenting.
    #[serde(default)]
    pub focus_task_id: Option<u64>,
}

impl UserPreferences {
    pub fn default_for(user_id: u64) -> Self {
        Self {
            user_id,
            default_view: ViewType::List,
            show_completed_tasks: false,
            focus_mode_enabled: false,
            focus_mode_duration: 60,
            theme: "light".to_string(),
            focus_task_id: None,
        }
    }
}

/// Everything needed to create a task; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub user_id: u64,
    pub description: Option<String>,
    pub priority: Priority,
    pub category_id: Option<u64>,
    pub due_date: Option<DateTime<Utc>>,
    pub parent_task_id: Option<u64>,
    pub ai_generated: bool,
}

impl TaskDraft {
    pub fn new(title: String, user_id: u64) -> Self {
        Self {
            title,
            user_id,
            description: None,
            priority: Priority::Medium,
            category_id: None,
            due_date: None,
            parent_task_id: None,
            ai_generated: false,
        }
    }
}

/// The in-memory task store: one ordered table per record type, serial ids
/// per table. `open` binds it to a data directory of JSONL snapshot files;
/// `new` keeps everything in memory for tests and one-shot use.
#[derive(Debug, Default)]
pub struct MemStore {
    data_dir: Option<PathBuf>,
    tasks: BTreeMap<u64, Task>,
    categories: BTreeMap<u64, Category>,
    history: BTreeMap<u64, TaskHistory>,
    preferences: BTreeMap<u64, UserPreferences>,
    next_task_id: u64,
    next_category_id: u64,
    next_history_id: u64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            next_task_id: 1,
            next_category_id: 1,
            next_history_id: 1,
            ..Self::default()
        }
    }

    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let mut store = Self::new();

        let tasks: Vec<Task> = load_jsonl(&data_dir.join(TASKS_FILE))?;
        let categories: Vec<Category> = load_jsonl(&data_dir.join(CATEGORIES_FILE))?;
        let history: Vec<TaskHistory> = load_jsonl(&data_dir.join(HISTORY_FILE))?;
        let preferences: Vec<UserPreferences> = load_jsonl(&data_dir.join(PREFERENCES_FILE))?;

        for task in tasks {
            store.next_task_id = store.next_task_id.max(task.id + 1);
            store.tasks.insert(task.id, task);
        }
        for category in categories {
            store.next_category_id = store.next_category_id.max(category.id + 1);
            store.categories.insert(category.id, category);
        }
        for row in history {
            store.next_history_id = store.next_history_id.max(row.id + 1);
            store.history.insert(row.id, row);
        }
        for prefs in preferences {
            store.preferences.insert(prefs.user_id, prefs);
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = store.tasks.len(),
            categories = store.categories.len(),
            history = store.history.len(),
            "opened store"
        );

        store.data_dir = Some(data_dir);
        Ok(store)
    }

    /// Writes every table back to its snapshot file. A no-op for in-memory
    /// stores.
    #[tracing::instrument(skip(self))]
    pub fn persist(&self) -> anyhow::Result<()> {
        let Some(dir) = &self.data_dir else {
            debug!("in-memory store, nothing to persist");
            return Ok(());
        };

        let tasks: Vec<&Task> = self.tasks.values().collect();
        let categories: Vec<&Category> = self.categories.values().collect();
        let history: Vec<&TaskHistory> = self.history.values().collect();
        let preferences: Vec<&UserPreferences> = self.preferences.values().collect();

        save_jsonl_atomic(&dir.join(TASKS_FILE), &tasks).context("failed to save tasks.data")?;
        save_jsonl_atomic(&dir.join(CATEGORIES_FILE), &categories)
            .context("failed to save categories.data")?;
        save_jsonl_atomic(&dir.join(HISTORY_FILE), &history)
            .context("failed to save history.data")?;
        save_jsonl_atomic(&dir.join(PREFERENCES_FILE), &preferences)
            .context("failed to save preferences.data")?;
        Ok(())
    }

    pub fn tasks_for_user(&self, user_id: u64) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn get_task(&self, id: u64) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn subtasks_of(&self, parent_id: u64) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.parent_task_id == Some(parent_id))
            .cloned()
            .collect()
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Task {
        let id = self.next_task_id;
        self.next_task_id += 1;

        let mut task = Task::new(id, draft.title, draft.user_id, now);
        task.description = draft.description;
        task.priority = draft.priority;
        task.category_id = draft.category_id;
        task.due_date = draft.due_date;
        task.parent_task_id = draft.parent_task_id;
        task.ai_generated = draft.ai_generated;

        self.record_history(
            id,
            task.user_id,
            HistoryAction::Created,
            None,
            Some(task.status),
            now,
        );
        self.tasks.insert(id, task.clone());
        info!(id, "created task");
        task
    }

    /// Applies a mutation to a task and records a history row. The action is
    /// derived from the status transition the mutation caused.
    #[tracing::instrument(skip(self, apply))]
    pub fn modify_task(
        &mut self,
        id: u64,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Task),
    ) -> anyhow::Result<Task> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no such task: {id}"))?;

        let previous_status = task.status;
        apply(task);
        task.updated_at = Some(now);
        let snapshot = task.clone();

        let action = match (previous_status, snapshot.status) {
            (before, after) if before == after => HistoryAction::Updated,
            (_, Status::Completed) => HistoryAction::Completed,
            (Status::Completed, _) => HistoryAction::Reopened,
            _ => HistoryAction::Updated,
        };
        self.record_history(
            id,
            snapshot.user_id,
            action,
            Some(previous_status),
            Some(snapshot.status),
            now,
        );
        Ok(snapshot)
    }

    pub fn complete_task(&mut self, id: u64, now: DateTime<Utc>) -> anyhow::Result<Task> {
        self.modify_task(id, now, |task| task.complete(now))
    }

    pub fn reopen_task(&mut self, id: u64, now: DateTime<Utc>) -> anyhow::Result<Task> {
        self.modify_task(id, now, |task| task.reopen(now))
    }

    pub fn start_task(&mut self, id: u64, now: DateTime<Utc>) -> anyhow::Result<Task> {
        self.modify_task(id, now, |task| task.set_status(Status::InProgress, now))
    }

    /// Removes a task and its audit trail. Subtasks stay in place with a
    /// dangling parent reference.
    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: u64) -> anyhow::Result<Task> {
        let task = self
            .tasks
            .remove(&id)
            .ok_or_else(|| anyhow!("no such task: {id}"))?;
        self.history.retain(|_, row| row.task_id != id);
        info!(id, "deleted task");
        Ok(task)
    }

    /// Upserts externally supplied task records, keeping their ids, and
    /// advances the id counter past them.
    #[tracing::instrument(skip(self, tasks))]
    pub fn import_tasks(&mut self, tasks: Vec<Task>) -> usize {
        let count = tasks.len();
        for task in tasks {
            self.next_task_id = self.next_task_id.max(task.id + 1);
            self.tasks.insert(task.id, task);
        }
        info!(count, "imported tasks");
        count
    }

    pub fn categories_for_user(&self, user_id: u64) -> Vec<Category> {
        self.categories
            .values()
            .filter(|category| category.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn get_category(&self, id: u64) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn find_category(&self, user_id: u64, name: &str) -> Option<&Category> {
        self.categories
            .values()
            .find(|category| category.user_id == user_id && category.name.eq_ignore_ascii_case(name))
    }

    #[tracing::instrument(skip(self))]
    pub fn create_category(
        &mut self,
        name: &str,
        color: &str,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Category {
        let id = self.next_category_id;
        self.next_category_id += 1;

        let category = Category {
            id,
            name: name.to_string(),
            color: color.to_string(),
            user_id,
            created_at: now,
        };
        self.categories.insert(id, category.clone());
        info!(id, name, "created category");
        category
    }

    pub fn update_category(
        &mut self,
        id: u64,
        apply: impl FnOnce(&mut Category),
    ) -> anyhow::Result<Category> {
        let category = self
            .categories
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no such category: {id}"))?;
        apply(category);
        Ok(category.clone())
    }

    /// Removes a category. Tasks referencing it keep the dangling id; the
    /// view layer treats it like no category at all.
    #[tracing::instrument(skip(self))]
    pub fn delete_category(&mut self, id: u64) -> anyhow::Result<Category> {
        self.categories
            .remove(&id)
            .ok_or_else(|| anyhow!("no such category: {id}"))
    }

    pub fn history_for_task(&self, task_id: u64) -> Vec<TaskHistory> {
        self.history
            .values()
            .filter(|row| row.task_id == task_id)
            .cloned()
            .collect()
    }

    /// A user's full audit trail, newest first.
    pub fn history_for_user(&self, user_id: u64) -> Vec<TaskHistory> {
        self.history
            .values()
            .rev()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn preferences(&self, user_id: u64) -> UserPreferences {
        self.preferences
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferences::default_for(user_id))
    }

    pub fn update_preferences(
        &mut self,
        user_id: u64,
        apply: impl FnOnce(&mut UserPreferences),
    ) -> UserPreferences {
        let prefs = self
            .preferences
            .entry(user_id)
            .or_insert_with(|| UserPreferences::default_for(user_id));
        apply(prefs);
        prefs.clone()
    }

    fn record_history(
        &mut self,
        task_id: u64,
        user_id: u64,
        action: HistoryAction,
        previous_status: Option<Status>,
        new_status: Option<Status>,
        now: DateTime<Utc>,
    ) {
        let id = self.next_history_id;
        self.next_history_id += 1;
        self.history.insert(
            id,
            TaskHistory {
                id,
                task_id,
                user_id,
                action,
                previous_status,
                new_status,
                timestamp: now,
            },
        );
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)
        .with_context(|| format!("failed opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{MemStore, TaskDraft};
    use crate::task::{HistoryAction, Status};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now")
    }

    #[test]
    fn ids_are_serial_per_table() {
        let mut store = MemStore::new();
        let a = store.create_task(TaskDraft::new("A".to_string(), 1), now());
        let b = store.create_task(TaskDraft::new("B".to_string(), 1), now());
        let c = store.create_category("Work", "#4338ca", 1, now());

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(c.id, 1);
    }

    #[test]
    fn lifecycle_leaves_an_audit_trail() {
        let mut store = MemStore::new();
        let task = store.create_task(TaskDraft::new("Audit me".to_string(), 1), now());

        store.complete_task(task.id, now()).expect("complete");
        store.reopen_task(task.id, now()).expect("reopen");

        let trail: Vec<HistoryAction> = store
            .history_for_task(task.id)
            .iter()
            .map(|row| row.action)
            .collect();
        assert_eq!(
            trail,
            vec![HistoryAction::Created, HistoryAction::Completed, HistoryAction::Reopened]
        );

        let reloaded = store.get_task(task.id).expect("task exists");
        assert_eq!(reloaded.status, Status::Todo);
        assert!(!reloaded.completed);
    }

    #[test]
    fn modify_without_status_change_records_update() {
        let mut store = MemStore::new();
        let task = store.create_task(TaskDraft::new("Rename me".to_string(), 1), now());

        store
            .modify_task(task.id, now(), |t| t.title = "Renamed".to_string())
            .expect("modify");

        let rows = store.history_for_task(task.id);
        assert_eq!(rows.last().map(|r| r.action), Some(HistoryAction::Updated));
    }

    #[test]
    fn delete_drops_task_and_its_history() {
        let mut store = MemStore::new();
        let task = store.create_task(TaskDraft::new("Doomed".to_string(), 1), now());
        store.complete_task(task.id, now()).expect("complete");

        store.delete_task(task.id).expect("delete");
        assert!(store.get_task(task.id).is_none());
        assert!(store.history_for_task(task.id).is_empty());
    }

    #[test]
    fn deleting_a_category_leaves_tasks_dangling() {
        let mut store = MemStore::new();
        let category = store.create_category("Errands", "#16a34a", 1, now());
        let mut draft = TaskDraft::new("Buy milk".to_string(), 1);
        draft.category_id = Some(category.id);
        let task = store.create_task(draft, now());

        store.delete_category(category.id).expect("delete category");
        let kept = store.get_task(task.id).expect("task survives");
        assert_eq!(kept.category_id, Some(category.id));
        assert!(store.get_category(category.id).is_none());
    }

    #[test]
    fn preferences_fall_back_to_defaults() {
        let store = MemStore::new();
        let prefs = store.preferences(1);
        assert!(!prefs.focus_mode_enabled);
        assert_eq!(prefs.focus_mode_duration, 60);
    }

    #[test]
    fn reopened_store_sees_persisted_tables_and_resumes_ids() {
        let dir = tempfile::tempdir().expect("tempdir");

        {
            let mut store = MemStore::open(dir.path()).expect("open");
            let task = store.create_task(TaskDraft::new("Persist me".to_string(), 1), now());
            store.create_category("Work", "#4338ca", 1, now());
            store.complete_task(task.id, now()).expect("complete");
            store.update_preferences(1, |p| p.focus_mode_enabled = true);
            store.persist().expect("persist");
        }

        let mut store = MemStore::open(dir.path()).expect("reopen");
        let tasks = store.tasks_for_user(1);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, Status::Completed);
        assert_eq!(store.categories_for_user(1).len(), 1);
        assert_eq!(store.history_for_task(tasks[0].id).len(), 2);
        assert!(store.preferences(1).focus_mode_enabled);

        let next = store.create_task(TaskDraft::new("Next".to_string(), 1), now());
        assert_eq!(next.id, 2);
    }
}

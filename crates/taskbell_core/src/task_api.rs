use crate::clock::parse_hhmm;
use crate::error::AppError;
use crate::model::{Task, new_task_id};
use crate::storage::{FileStore, KeyValueStore, StoreAdapter};
use tracing::{debug, info};

/// The task collection and every operation allowed to change it.
///
/// Each mutation persists the full collection before returning.
#[derive(Debug)]
pub struct TaskList<S> {
    adapter: StoreAdapter<S>,
    tasks: Vec<Task>,
}

impl<S: KeyValueStore> TaskList<S> {
    pub fn open(store: S) -> Result<Self, AppError> {
        let mut list = Self {
            adapter: StoreAdapter::new(store),
            tasks: Vec::new(),
        };
        list.load()?;
        Ok(list)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn store(&self) -> &S {
        self.adapter.store()
    }

    pub fn into_store(self) -> S {
        self.adapter.into_inner()
    }

    /// Re-reads the collection, picking up writes from other processes.
    pub fn reload(&mut self) -> Result<(), AppError> {
        self.adapter.refresh();
        self.load()
    }

    fn load(&mut self) -> Result<(), AppError> {
        self.tasks = self.adapter.load_tasks();

        let mut assigned = 0;
        for task in self.tasks.iter_mut().filter(|task| task.id.is_empty()) {
            task.id = new_task_id();
            assigned += 1;
        }
        if assigned > 0 {
            debug!(assigned, "assigned ids to stored tasks");
            self.save()?;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), AppError> {
        self.adapter.save_tasks(&self.tasks)
    }

    /// Blank text is ignored and yields `Ok(None)`.
    pub fn add(&mut self, text: &str, reminder: Option<&str>) -> Result<Option<Task>, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let reminder = match reminder.map(str::trim) {
            Some(value) if !value.is_empty() => Some(parse_hhmm(value)?),
            _ => None,
        };

        let task = Task::new(trimmed, reminder.as_deref());
        self.tasks.push(task.clone());
        self.save()?;
        info!(id = %task.id, reminder = %task.reminder, "task added");

        Ok(Some(task))
    }

    pub fn toggle_complete(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        let updated = task.clone();
        self.save()?;
        info!(id = %updated.id, completed = updated.completed, "task toggled");

        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self.position(id)?;
        let removed = self.tasks.remove(index);
        self.save()?;
        info!(id = %removed.id, "task deleted");

        Ok(removed)
    }

    /// Returns how many tasks were dropped.
    pub fn clear_all(&mut self) -> Result<usize, AppError> {
        let cleared = self.tasks.len();
        self.tasks.clear();
        self.save()?;
        info!(cleared, "tasks cleared");

        Ok(cleared)
    }

    pub fn mark_notified(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        if task.reminder().is_none() {
            return Err(AppError::invalid_input("task has no reminder"));
        }
        task.notified = true;
        let updated = task.clone();
        self.save()?;

        Ok(updated)
    }

    pub fn dark_mode(&self) -> bool {
        self.adapter.load_dark_mode()
    }

    /// Flips the persisted theme flag and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool, AppError> {
        let enabled = !self.adapter.load_dark_mode();
        self.adapter.save_dark_mode(enabled)?;
        info!(enabled, "dark mode toggled");

        Ok(enabled)
    }

    /// Resolves a full id or an unambiguous id prefix to the full id.
    pub fn resolve_id(&self, raw: &str) -> Result<String, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        if let Some(task) = self.tasks.iter().find(|task| task.id == trimmed) {
            return Ok(task.id.clone());
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|task| task.id.starts_with(trimmed));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (Some(_), Some(_)) => Err(AppError::invalid_input(format!(
                "id prefix '{trimmed}' is ambiguous"
            ))),
            (None, _) => Err(AppError::invalid_input("task not found")),
        }
    }

    fn position(&self, id: &str) -> Result<usize, AppError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }
}

pub fn open_default() -> Result<TaskList<FileStore>, AppError> {
    TaskList::open(FileStore::open_default()?)
}

pub fn list_tasks() -> Result<Vec<Task>, AppError> {
    Ok(open_default()?.tasks().to_vec())
}

pub fn add_task(text: &str, reminder: Option<&str>) -> Result<Option<Task>, AppError> {
    open_default()?.add(text, reminder)
}

pub fn toggle_task(id: &str) -> Result<Task, AppError> {
    let mut list = open_default()?;
    let id = list.resolve_id(id)?;
    list.toggle_complete(&id)
}

pub fn delete_task(id: &str) -> Result<Task, AppError> {
    let mut list = open_default()?;
    let id = list.resolve_id(id)?;
    list.delete(&id)
}

pub fn clear_tasks() -> Result<usize, AppError> {
    open_default()?.clear_all()
}

pub fn dark_mode() -> Result<bool, AppError> {
    Ok(open_default()?.dark_mode())
}

pub fn toggle_dark_mode() -> Result<bool, AppError> {
    open_default()?.toggle_dark_mode()
}

#[cfg(test)]
mod tests {
    use super::TaskList;
    use crate::model::Task;
    use crate::storage::{FileStore, KeyValueStore, MemoryStore, StoreAdapter, TASKS_KEY};
    use tempfile::TempDir;

    fn task(id: &str, text: &str) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            completed: false,
            reminder: String::new(),
            notified: false,
        }
    }

    fn list_with(tasks: &[Task]) -> TaskList<MemoryStore> {
        let mut adapter = StoreAdapter::new(MemoryStore::new());
        adapter.save_tasks(tasks).unwrap();
        TaskList::open(adapter.into_inner()).unwrap()
    }

    fn persisted(list: &TaskList<MemoryStore>) -> Vec<Task> {
        let raw = list.store().get(TASKS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn add_appends_trimmed_pending_task() {
        let mut list = list_with(&[task("a", "first")]);

        let added = list.add("  second  ", None).unwrap().unwrap();

        assert_eq!(list.tasks().len(), 2);
        assert_eq!(list.tasks()[1], added);
        assert_eq!(added.text, "second");
        assert!(!added.completed);
        assert!(!added.notified);
        assert_eq!(added.reminder(), None);
        assert_eq!(persisted(&list), list.tasks());
    }

    #[test]
    fn add_blank_text_is_a_silent_no_op() {
        let mut list = list_with(&[task("a", "first")]);

        assert_eq!(list.add("", Some("09:00")).unwrap(), None);
        assert_eq!(list.add("   \t", None).unwrap(), None);

        assert_eq!(list.tasks().len(), 1);
        assert_eq!(persisted(&list).len(), 1);
    }

    #[test]
    fn add_keeps_normalized_reminder() {
        let mut list = list_with(&[]);

        let added = list.add("stand up", Some(" 09:30 ")).unwrap().unwrap();
        assert_eq!(added.reminder(), Some("09:30"));

        let no_reminder = list.add("sit down", Some("  ")).unwrap().unwrap();
        assert_eq!(no_reminder.reminder(), None);
    }

    #[test]
    fn add_rejects_malformed_reminder() {
        let mut list = list_with(&[]);

        let err = list.add("stand up", Some("9.30pm")).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert!(list.tasks().is_empty());
    }

    #[test]
    fn duplicate_texts_are_allowed() {
        let mut list = list_with(&[]);
        let first = list.add("same", None).unwrap().unwrap();
        let second = list.add("same", None).unwrap().unwrap();

        assert_eq!(list.tasks().len(), 2);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn toggle_twice_restores_and_persists_each_state() {
        let mut list = list_with(&[task("a", "first")]);

        let toggled = list.toggle_complete("a").unwrap();
        assert!(toggled.completed);
        assert!(persisted(&list)[0].completed);

        let restored = list.toggle_complete("a").unwrap();
        assert!(!restored.completed);
        assert!(!persisted(&list)[0].completed);
    }

    #[test]
    fn delete_removes_exactly_one_and_shifts_later_tasks() {
        let mut list = list_with(&[task("a", "one"), task("b", "two"), task("c", "three")]);

        let removed = list.delete("b").unwrap();

        assert_eq!(removed.id, "b");
        let ids: Vec<&str> = list.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(persisted(&list).len(), 2);
    }

    #[test]
    fn stale_ids_are_rejected_without_changes() {
        let mut list = list_with(&[task("a", "one")]);
        list.delete("a").unwrap();

        assert_eq!(list.delete("a").unwrap_err().code(), "invalid_input");
        assert_eq!(list.toggle_complete("a").unwrap_err().code(), "invalid_input");
        assert!(list.tasks().is_empty());
    }

    #[test]
    fn clear_all_empties_collection_and_store() {
        let mut list = list_with(&[task("a", "one"), task("b", "two")]);

        assert_eq!(list.clear_all().unwrap(), 2);
        assert!(list.tasks().is_empty());
        assert_eq!(list.store().get(TASKS_KEY).unwrap().as_deref(), Some("[]"));

        assert_eq!(list.clear_all().unwrap(), 0);
        assert_eq!(list.store().get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn open_assigns_ids_to_legacy_records() {
        let mut store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"text":"old","completed":false,"reminder":"07:15","notified":false}]"#,
            )
            .unwrap();

        let list = TaskList::open(store).unwrap();

        assert_eq!(list.tasks().len(), 1);
        assert!(!list.tasks()[0].id.is_empty());
        assert_eq!(persisted(&list)[0].id, list.tasks()[0].id);
    }

    #[test]
    fn mark_notified_requires_reminder() {
        let mut with_reminder = task("a", "ring");
        with_reminder.reminder = "09:00".to_string();
        let mut list = list_with(&[with_reminder, task("b", "quiet")]);

        assert!(list.mark_notified("a").unwrap().notified);
        assert!(persisted(&list)[0].notified);
        assert_eq!(list.mark_notified("b").unwrap_err().code(), "invalid_input");
        assert!(!list.tasks()[1].notified);
    }

    #[test]
    fn toggle_dark_mode_flips_and_persists() {
        let mut list = list_with(&[]);
        assert!(!list.dark_mode());

        assert!(list.toggle_dark_mode().unwrap());
        let reopened = TaskList::open(list.into_store()).unwrap();
        assert!(reopened.dark_mode());
    }

    #[test]
    fn dark_mode_is_independent_of_tasks() {
        let mut list = list_with(&[task("a", "one")]);
        list.toggle_dark_mode().unwrap();
        list.clear_all().unwrap();

        assert!(list.dark_mode());
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let list = list_with(&[task("abc-1", "one"), task("abd-2", "two")]);

        assert_eq!(list.resolve_id("abc-1").unwrap(), "abc-1");
        assert_eq!(list.resolve_id(" abd ").unwrap(), "abd-2");
        assert_eq!(list.resolve_id("ab").unwrap_err().code(), "invalid_input");
        assert_eq!(list.resolve_id("zz").unwrap_err().code(), "invalid_input");
        assert_eq!(list.resolve_id("  ").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn reload_sees_writes_from_another_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut watcher = TaskList::open(FileStore::open(&path)).unwrap();
        let mut writer = TaskList::open(FileStore::open(&path)).unwrap();
        writer.add("from elsewhere", None).unwrap();

        assert!(watcher.tasks().is_empty());
        watcher.reload().unwrap();
        assert_eq!(watcher.tasks().len(), 1);
        assert_eq!(watcher.tasks()[0].text, "from elsewhere");
    }
}

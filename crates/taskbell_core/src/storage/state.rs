use crate::error::AppError;
use crate::model::Task;
use crate::storage::KeyValueStore;
use tracing::warn;

pub const TASKS_KEY: &str = "tasks";
pub const DARK_MODE_KEY: &str = "darkMode";

/// Maps the task collection and the dark-mode flag onto two store keys.
#[derive(Debug)]
pub struct StoreAdapter<S> {
    store: S,
}

impl<S: KeyValueStore> StoreAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn refresh(&mut self) {
        self.store.refresh();
    }

    /// Absent or unparseable data reads as an empty collection.
    pub fn load_tasks(&self) -> Vec<Task> {
        let raw = match self.store.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read tasks, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "stored tasks are malformed, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save_tasks(&mut self, tasks: &[Task]) -> Result<(), AppError> {
        let content = serde_json::to_string(tasks)?;
        self.store.set(TASKS_KEY, &content)
    }

    pub fn load_dark_mode(&self) -> bool {
        matches!(self.store.get(DARK_MODE_KEY), Ok(Some(value)) if value == "true")
    }

    pub fn save_dark_mode(&mut self, enabled: bool) -> Result<(), AppError> {
        self.store
            .set(DARK_MODE_KEY, if enabled { "true" } else { "false" })
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the task list.
///
/// `reminder` is an `HH:MM` local wall-clock time, empty when the task has
/// no reminder. `notified` flips once the reminder has fired and is never
/// cleared, so every reminder is one-shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub reminder: String,
    #[serde(default)]
    pub notified: bool,
}

impl Task {
    pub fn new(text: &str, reminder: Option<&str>) -> Self {
        Self {
            id: new_task_id(),
            text: text.to_string(),
            completed: false,
            reminder: reminder.unwrap_or_default().to_string(),
            notified: false,
        }
    }

    pub fn reminder(&self) -> Option<&str> {
        if self.reminder.is_empty() {
            None
        } else {
            Some(self.reminder.as_str())
        }
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

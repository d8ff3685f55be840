use crate::model::Task;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub id: String,
    pub label: String,
    pub completed: bool,
}

/// A from-scratch view of the task list plus its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedList {
    pub rows: Vec<RenderedRow>,
    pub pending: usize,
    pub completed: usize,
}

impl RenderedList {
    pub fn pending_caption(&self) -> String {
        format!("Pending 🕓: {}", self.pending)
    }

    pub fn completed_caption(&self) -> String {
        format!("Completed✅ : {}", self.completed)
    }
}

pub fn label(task: &Task) -> String {
    match task.reminder() {
        Some(reminder) => format!("{} (Reminder: {})", task.text, reminder),
        None => task.text.clone(),
    }
}

pub fn render(tasks: &[Task]) -> RenderedList {
    let rows: Vec<RenderedRow> = tasks
        .iter()
        .map(|task| RenderedRow {
            id: task.id.clone(),
            label: label(task),
            completed: task.completed,
        })
        .collect();
    let completed = rows.iter().filter(|row| row.completed).count();

    RenderedList {
        pending: rows.len() - completed,
        completed,
        rows,
    }
}

use crate::alarm::StopAlarm;
use crate::model::Task;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;
use tracing::debug;

/// Asks the user whether to silence a ringing alarm.
///
/// Implementations must return immediately and run `on_confirm` later, from
/// whatever thread receives the answer.
pub trait Prompt {
    fn ask_stop(&self, task: &Task, on_confirm: StopAlarm);
}

pub fn prompt_message(task: &Task) -> String {
    format!("Reminder: {}\n\nStop alarm?", task.text)
}

static STDIN_GATE: Mutex<()> = Mutex::new(());

/// Prints the question on stdout and answers it from stdin on a helper
/// thread. Concurrent prompts are answered in the order they were asked.
///
/// Closing stdin counts as confirming, since no later answer can arrive.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask_stop(&self, task: &Task, on_confirm: StopAlarm) {
        let message = prompt_message(task);
        std::thread::spawn(move || {
            let Ok(_gate) = STDIN_GATE.lock() else {
                return;
            };

            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{message} [y/N] ");
            let _ = stdout.flush();
            drop(stdout);

            let mut answer = String::new();
            match std::io::stdin().lock().read_line(&mut answer) {
                Ok(0) => {
                    debug!("stdin closed, stopping alarm");
                    on_confirm();
                }
                Ok(_) if is_yes(&answer) => on_confirm(),
                Ok(_) | Err(_) => {}
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Confirmed,
    Declined,
}

/// Questions waiting for a line the interactive shell reads on its own
/// stdin loop.
#[derive(Default)]
pub struct QueuedPrompt {
    pending: Mutex<VecDeque<StopAlarm>>,
}

impl QueuedPrompt {
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    /// Answers the oldest open question with `line`.
    ///
    /// Returns `None` when nothing is pending or the line is neither yes
    /// nor no, so the caller can treat it as a command.
    pub fn answer(&self, line: &str) -> Option<Answer> {
        let confirmed = if is_yes(line) {
            true
        } else if is_no(line) {
            false
        } else {
            return None;
        };

        let on_confirm = self.pending.lock().ok()?.pop_front()?;
        if confirmed {
            on_confirm();
            Some(Answer::Confirmed)
        } else {
            Some(Answer::Declined)
        }
    }

    /// Forgets every open question and returns how many there were.
    pub fn clear(&self) -> usize {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending).len(),
            Err(_) => 0,
        }
    }
}

impl Prompt for QueuedPrompt {
    fn ask_stop(&self, task: &Task, on_confirm: StopAlarm) {
        println!("{} [y/N]", prompt_message(task));
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(on_confirm);
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn is_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no")
}

#[cfg(test)]
mod tests {
    use super::{Answer, Prompt, QueuedPrompt, is_yes, prompt_message};
    use crate::model::Task;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn message_names_the_task() {
        let task = Task::new("take pills", Some("08:00"));
        assert_eq!(prompt_message(&task), "Reminder: take pills\n\nStop alarm?");
    }

    #[test]
    fn only_affirmative_answers_confirm() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn queued_answers_go_to_the_oldest_question() {
        let prompt = QueuedPrompt::default();
        let stops = Arc::new(AtomicUsize::new(0));
        for text in ["first", "second"] {
            let stops = Arc::clone(&stops);
            prompt.ask_stop(
                &Task::new(text, Some("08:00")),
                Box::new(move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        assert_eq!(prompt.pending(), 2);

        assert_eq!(prompt.answer("list"), None);
        assert_eq!(prompt.pending(), 2);

        assert_eq!(prompt.answer("n"), Some(Answer::Declined));
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        assert_eq!(prompt.answer(" Y "), Some(Answer::Confirmed));
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        assert_eq!(prompt.answer("y"), None);
        assert_eq!(prompt.pending(), 0);
    }

    #[test]
    fn clear_drops_open_questions() {
        let prompt = QueuedPrompt::default();
        prompt.ask_stop(&Task::new("ring", Some("08:00")), Box::new(|| {}));

        assert_eq!(prompt.clear(), 1);
        assert_eq!(prompt.answer("y"), None);
    }
}

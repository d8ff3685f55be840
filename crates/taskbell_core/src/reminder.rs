use crate::alarm::{Alarm, stop_handle};
use crate::clock::Clock;
use crate::error::AppError;
use crate::model::Task;
use crate::notify::{Notifier, Permission};
use crate::prompt::Prompt;
use crate::storage::KeyValueStore;
use crate::task_api::TaskList;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub fn is_due(task: &Task, now: &str) -> bool {
    !task.notified && task.reminder().is_some_and(|reminder| reminder == now)
}

/// Fires one-shot reminders whose `HH:MM` equals the current minute.
///
/// A minute that is never polled is never fired; there is no catch-up.
pub struct ReminderPoller<'a> {
    notifier: &'a dyn Notifier,
    prompt: &'a dyn Prompt,
    alarm: Arc<dyn Alarm>,
    permission: Permission,
}

impl<'a> ReminderPoller<'a> {
    pub fn new(notifier: &'a dyn Notifier, prompt: &'a dyn Prompt, alarm: Arc<dyn Alarm>) -> Self {
        let permission = match notifier.permission() {
            Permission::Default => notifier.request_permission(),
            decided => decided,
        };
        debug!(?permission, "notification permission");

        Self {
            notifier,
            prompt,
            alarm,
            permission,
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Checks every task against `now` and returns the ones that fired.
    pub fn tick<S: KeyValueStore>(
        &self,
        list: &mut TaskList<S>,
        now: &str,
    ) -> Result<Vec<Task>, AppError> {
        list.reload()?;
        let due: Vec<Task> = list
            .tasks()
            .iter()
            .filter(|task| is_due(task, now))
            .cloned()
            .collect();
        debug!(now, due = due.len(), "reminder tick");

        let mut fired = Vec::with_capacity(due.len());
        for task in due {
            self.fire(&task);
            fired.push(list.mark_notified(&task.id)?);
        }

        Ok(fired)
    }

    fn fire(&self, task: &Task) {
        info!(id = %task.id, reminder = %task.reminder, "reminder due");
        if let Err(err) = self.alarm.start() {
            warn!(error = %err, "alarm failed to start");
        }

        if self.permission == Permission::Granted {
            match self.notifier.notify_reminder(task, stop_handle(&self.alarm)) {
                Ok(()) => return,
                Err(err) => warn!(error = %err, "notification failed, prompting instead"),
            }
        }

        self.prompt.ask_stop(task, stop_handle(&self.alarm));
    }

    /// Ticks every `interval` until `max_ticks` is reached, or forever.
    pub fn run<S: KeyValueStore>(
        &self,
        list: &mut TaskList<S>,
        clock: &dyn Clock,
        interval: Duration,
        max_ticks: Option<u64>,
        mut on_fired: impl FnMut(&Task),
    ) -> Result<(), AppError> {
        let mut ticks = 0u64;
        loop {
            let now = clock.now_hhmm()?;
            for task in self.tick(list, &now)? {
                on_fired(&task);
            }

            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                return Ok(());
            }
            std::thread::sleep(interval);
        }
    }
}

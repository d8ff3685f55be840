use crate::alarm::StopAlarm;
use crate::error::AppError;
use crate::model::Task;
use crate::notify::{Notifier, REMINDER_ICON, REMINDER_TITLE, reminder_body};
use notify_rust::{Notification, Timeout, Urgency};

const STOP_ACTION: &str = "stop";

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify_reminder(&self, task: &Task, on_click: StopAlarm) -> Result<(), AppError> {
        let handle = Notification::new()
            .appname("taskbell")
            .summary(REMINDER_TITLE)
            .body(&reminder_body(task))
            .icon(REMINDER_ICON)
            .action("default", "Stop alarm")
            .action(STOP_ACTION, "Stop alarm")
            .urgency(Urgency::Critical)
            .timeout(Timeout::Never)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        std::thread::spawn(move || {
            handle.wait_for_action(|selected| {
                if stops_alarm(selected) {
                    on_click();
                }
            });
        });

        Ok(())
    }
}

/// Expiry and server-side closes report `__closed` and leave the alarm on.
fn stops_alarm(selected: &str) -> bool {
    selected == STOP_ACTION || selected == "default"
}

#[cfg(test)]
mod tests {
    use super::stops_alarm;

    #[test]
    fn only_clicks_stop_the_alarm() {
        assert!(stops_alarm("default"));
        assert!(stops_alarm("stop"));
        assert!(!stops_alarm("__closed"));
        assert!(!stops_alarm(""));
    }
}

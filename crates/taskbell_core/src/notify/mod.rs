use crate::alarm::StopAlarm;
use crate::error::AppError;
use crate::model::Task;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "TASKBELL_DISABLE_NOTIFICATIONS";
pub const REMINDER_TITLE: &str = "Reminder";
pub const REMINDER_ICON: &str = "alarm-clock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not yet decided; the poller asks once at startup.
    Default,
}

pub trait Notifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> Permission {
        self.permission()
    }

    /// Shows the reminder; `on_click` runs when the user activates it.
    fn notify_reminder(&self, task: &Task, on_click: StopAlarm) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn notify_reminder(&self, _task: &Task, _on_click: StopAlarm) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn reminder_body(task: &Task) -> String {
    format!("{} ⏰", task.text)
}

pub fn notifier_from_env(enabled: bool) -> Box<dyn Notifier> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() || !enabled {
        return Box::new(NoopNotifier);
    }

    match platform_notifier() {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::debug!(error = %err, "falling back to prompts");
            Box::new(NoopNotifier)
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{NoopNotifier, Notifier, Permission, notifier_from_env, reminder_body};
    use crate::model::Task;

    #[test]
    fn reminder_body_appends_clock() {
        let task = Task::new("stretch", Some("10:00"));
        assert_eq!(reminder_body(&task), "stretch ⏰");
    }

    #[test]
    fn noop_notifier_is_never_granted() {
        assert_eq!(NoopNotifier.permission(), Permission::Denied);
        assert_eq!(NoopNotifier.request_permission(), Permission::Denied);
    }

    #[test]
    fn disabled_notifications_fall_back_to_noop() {
        let notifier = notifier_from_env(false);
        assert_eq!(notifier.permission(), Permission::Denied);
    }
}

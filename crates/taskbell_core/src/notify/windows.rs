use crate::alarm::StopAlarm;
use crate::error::AppError;
use crate::model::Task;
use crate::notify::{Notifier, REMINDER_TITLE, reminder_body};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify_reminder(&self, task: &Task, on_click: StopAlarm) -> Result<(), AppError> {
        let mut on_click = Some(on_click);
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(REMINDER_TITLE)
            .text1(&reminder_body(task))
            .on_activated(move |_args| {
                if let Some(stop) = on_click.take() {
                    stop();
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}

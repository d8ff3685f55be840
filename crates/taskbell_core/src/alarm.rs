use crate::config::SoundConfig;
use crate::error::AppError;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const DISABLE_SOUND_ENV_VAR: &str = "TASKBELL_DISABLE_SOUND";

const PLAYER_CANDIDATES: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"),
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

/// Called by whichever UI surface the user answers to silence the alarm.
pub type StopAlarm = Box<dyn FnOnce() + Send + 'static>;

/// A looping audio cue. `start` returns immediately; the cue keeps playing
/// until `stop`.
pub trait Alarm: Send + Sync {
    fn start(&self) -> Result<(), AppError>;

    fn stop(&self);

    fn is_ringing(&self) -> bool;
}

pub fn stop_handle(alarm: &Arc<dyn Alarm>) -> StopAlarm {
    let alarm = Arc::clone(alarm);
    Box::new(move || alarm.stop())
}

pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn start(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn stop(&self) {}

    fn is_ringing(&self) -> bool {
        false
    }
}

struct Cue {
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
}

/// Replays a sound file through an external player until stopped.
///
/// Every `start` spawns its own loop, so overlapping reminders overlap
/// audibly. `stop` ends all of them, and dropping the alarm stops it.
pub struct LoopingSound {
    player: String,
    file: String,
    cues: Mutex<Vec<Cue>>,
}

impl LoopingSound {
    pub fn new<P: Into<String>, F: Into<String>>(player: P, file: F) -> Self {
        Self {
            player: player.into(),
            file: file.into(),
            cues: Mutex::new(Vec::new()),
        }
    }

    /// Uses the configured player, or the first known sound file on disk.
    pub fn detect(config: &SoundConfig) -> Option<Self> {
        if let (Some(player), Some(file)) = (config.player.as_ref(), config.file.as_ref()) {
            return Some(Self::new(player.as_str(), file.as_str()));
        }

        PLAYER_CANDIDATES
            .iter()
            .filter(|(player, _)| config.player.as_deref().is_none_or(|wanted| wanted == *player))
            .find(|(_, file)| Path::new(file).exists())
            .map(|(player, file)| {
                let file = config.file.as_deref().unwrap_or(*file);
                Self::new(*player, file)
            })
    }

    /// Loops still playing. Loops that ended on their own are pruned.
    pub fn active_cues(&self) -> usize {
        match self.cues.lock() {
            Ok(mut cues) => {
                cues.retain(|cue| !cue.finished.load(Ordering::SeqCst));
                cues.len()
            }
            Err(_) => 0,
        }
    }
}

impl Drop for LoopingSound {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Alarm for LoopingSound {
    fn start(&self) -> Result<(), AppError> {
        let stopped = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let child = Arc::new(Mutex::new(None));
        let player = self.player.clone();
        let file = self.file.clone();

        let loop_stopped = Arc::clone(&stopped);
        let loop_finished = Arc::clone(&finished);
        let loop_child = Arc::clone(&child);
        std::thread::Builder::new()
            .name("taskbell-alarm".to_string())
            .spawn(move || {
                play_until_stopped(&player, &file, &loop_stopped, &loop_child);
                loop_finished.store(true, Ordering::SeqCst);
            })?;

        let mut cues = self
            .cues
            .lock()
            .map_err(|_| AppError::io("alarm state poisoned"))?;
        cues.retain(|cue| !cue.finished.load(Ordering::SeqCst));
        cues.push(Cue {
            stopped,
            finished,
            child,
        });
        info!(player = %self.player, file = %self.file, "alarm started");
        Ok(())
    }

    fn stop(&self) {
        let cues = match self.cues.lock() {
            Ok(mut cues) => std::mem::take(&mut *cues),
            Err(_) => return,
        };
        for cue in &cues {
            cue.stopped.store(true, Ordering::SeqCst);
            if let Ok(mut slot) = cue.child.lock()
                && let Some(child) = slot.as_mut()
            {
                let _ = child.kill();
            }
        }
        if !cues.is_empty() {
            info!(count = cues.len(), "alarm stopped");
        }
    }

    fn is_ringing(&self) -> bool {
        self.active_cues() > 0
    }
}

fn play_until_stopped(
    player: &str,
    file: &str,
    stopped: &AtomicBool,
    slot: &Mutex<Option<Child>>,
) {
    while !stopped.load(Ordering::SeqCst) {
        let spawned = Command::new(player)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                warn!(player, error = %err, "alarm playback unavailable");
                return;
            }
        };

        match slot.lock() {
            // stop() may have run between the spawn and taking the lock.
            Ok(_) if stopped.load(Ordering::SeqCst) => {
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Ok(mut guard) => *guard = Some(child),
            Err(_) => {
                let _ = child.kill();
                return;
            }
        }

        // Poll rather than wait() so stop() can take the lock and kill.
        loop {
            let finished = match slot.lock() {
                Ok(mut guard) => match guard.as_mut().map(Child::try_wait) {
                    Some(Ok(Some(status))) => Some(status.success()),
                    Some(Ok(None)) => None,
                    Some(Err(_)) | None => Some(false),
                },
                Err(_) => return,
            };
            match finished {
                Some(true) => break,
                Some(false) => {
                    if !stopped.load(Ordering::SeqCst) {
                        debug!(player, file, "alarm player exited abnormally");
                    }
                    return;
                }
                None => std::thread::sleep(Duration::from_millis(100)),
            }
        }
    }
}

pub fn alarm_from_config(config: &SoundConfig) -> Arc<dyn Alarm> {
    if std::env::var(DISABLE_SOUND_ENV_VAR).is_ok() || !config.enabled {
        return Arc::new(SilentAlarm);
    }

    match LoopingSound::detect(config) {
        Some(sound) => Arc::new(sound),
        None => {
            debug!("no audio player found, alarms will be silent");
            Arc::new(SilentAlarm)
        }
    }
}

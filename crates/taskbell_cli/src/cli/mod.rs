use clap::{Parser, Subcommand};
use taskbell_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "Task list with one-shot HH:MM reminders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task, optionally with a reminder time
    ///
    /// Example: taskbell add "Buy milk"
    /// Example: taskbell add "Call the dentist" --at 09:30
    Add {
        text: Option<String>,
        /// Reminder time of day, 24-hour HH:MM
        #[arg(long = "at", value_name = "HH:MM")]
        at: Option<String>,
    },
    /// Toggle a task between pending and completed
    ///
    /// Example: taskbell done 3f2a
    Done { id: String },
    /// Delete a task
    ///
    /// Example: taskbell delete 3f2a
    Delete { id: String },
    /// Delete every task
    ///
    /// Example: taskbell clear
    Clear,
    /// Show all tasks with pending and completed counts
    ///
    /// Example: taskbell list
    List,
    /// Toggle the dark theme
    ///
    /// Example: taskbell dark-mode
    DarkMode,
    /// Poll reminders once a minute and ring when one is due
    ///
    /// Example: taskbell watch
    /// Example: taskbell watch --once
    Watch {
        /// Check a single time and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    PollInterval,
    Notifications,
    SoundEnabled,
    SoundPlayer,
    SoundFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;
    let subfield = remainder.and_then(canonicalize_flag_name);

    let target = match (canonical_field.as_str(), subfield.as_deref()) {
        ("theme", None) => ConfigOverrideTarget::Theme,
        ("poll_interval_secs" | "poll_interval", None) => ConfigOverrideTarget::PollInterval,
        ("notifications", None) => ConfigOverrideTarget::Notifications,
        ("sound", None | Some("enabled")) => ConfigOverrideTarget::SoundEnabled,
        ("sound", Some("player")) => ConfigOverrideTarget::SoundPlayer,
        ("sound", Some("file")) => ConfigOverrideTarget::SoundFile,
        ("sound", Some(other)) => return Err(format!("unknown sound field '{other}'")),
        ("theme" | "poll_interval_secs" | "poll_interval" | "notifications", Some(_)) => {
            return Err(format!("{canonical_field} override cannot have subfields"));
        }
        (other, _) => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds parsed overrides into the shape the config layer merges.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::PollInterval => {
                let secs = parsed
                    .value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| "poll_interval_secs must be a positive integer".to_string())?;
                overrides.poll_interval_secs = Some(secs);
            }
            ConfigOverrideTarget::Notifications => {
                overrides.notifications = Some(parse_switch(&parsed.value)?);
            }
            ConfigOverrideTarget::SoundEnabled => {
                overrides.sound_enabled = Some(parse_switch(&parsed.value)?);
            }
            ConfigOverrideTarget::SoundPlayer => overrides.sound_player = Some(parsed.value),
            ConfigOverrideTarget::SoundFile => overrides.sound_file = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(format!("expected on/off, got '{other}'")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

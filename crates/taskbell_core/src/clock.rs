use crate::error::AppError;
use time::macros::format_description;
use time::{OffsetDateTime, Time, UtcOffset};

/// Source of the current local wall-clock minute.
pub trait Clock {
    fn now_hhmm(&self) -> Result<String, AppError>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_hhmm(&self) -> Result<String, AppError> {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        format_hhmm(OffsetDateTime::now_utc().to_offset(offset).time())
    }
}

/// A clock stuck at one minute.
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_hhmm(&self) -> Result<String, AppError> {
        Ok(self.0.clone())
    }
}

pub fn format_hhmm(time: Time) -> Result<String, AppError> {
    time.format(format_description!("[hour]:[minute]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

/// Parses a zero-padded 24-hour `HH:MM` string and returns it normalized.
pub fn parse_hhmm(raw: &str) -> Result<String, AppError> {
    let parsed = Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .map_err(|_| AppError::invalid_input("reminder must be HH:MM (24-hour)"))?;
    format_hhmm(parsed)
}

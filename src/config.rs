use std::env;
use std::path::PathBuf;

use chrono::{FixedOffset, Local, Offset, Utc};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub map_refresh_secs: u64,
    pub notification_history: usize,
    /// Offset used for calendar days and hour-of-day buckets.
    pub utc_offset: FixedOffset,
    pub seed_file: Option<PathBuf>,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let local_offset_minutes = Local::now().offset().fix().local_minus_utc() / 60;
        let offset_minutes: i32 = parse_or_default("UTC_OFFSET_MINUTES", local_offset_minutes)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            AppError::Internal(format!("invalid UTC_OFFSET_MINUTES: {offset_minutes}"))
        })?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            map_refresh_secs: parse_or_default("MAP_REFRESH_SECS", 10)?,
            notification_history: parse_or_default("NOTIFICATION_HISTORY", 50)?,
            utc_offset,
            seed_file: env::var("SEED_FILE").ok().map(PathBuf::from),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            map_refresh_secs: 10,
            notification_history: 50,
            utc_offset: Utc.fix(),
            seed_file: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

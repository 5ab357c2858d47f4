use crate::domain::Vec2;
use crate::domain::tuning::Tuning;
use std::path::{Path, PathBuf};
use std::{env, fs, time::Duration};

// Runtime constants and environment settings (not gameplay tuning).

pub fn store_url() -> String {
    env::var("STORE_URL").unwrap_or_else(|_| "http://127.0.0.1:54321".to_string())
}

pub fn realtime_url() -> String {
    env::var("REALTIME_URL").unwrap_or_else(|_| "ws://127.0.0.1:54321/realtime/v1".to_string())
}

pub fn store_api_key() -> String {
    env::var("STORE_API_KEY").unwrap_or_default()
}

/// Id of the authenticated player this process simulates.
pub fn session_id() -> Option<String> {
    env::var("SESSION_ID").ok().filter(|id| !id.trim().is_empty())
}

pub fn tuning_path() -> Option<PathBuf> {
    env::var_os("TUNING_PATH").map(PathBuf::from)
}

/// Scheduling cadence for loop frames (the fixed step is independent of this).
pub fn frame_interval() -> Duration {
    let millis = env::var("RENDER_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(16);
    Duration::from_millis(millis)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

// Best-effort delete of the own row on exit.
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

pub const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SESSION_ID is not set")]
    MissingSessionId,
    #[error("failed to read tuning file {path}: {source}")]
    ReadTuning {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid tuning file {path}: {source}")]
    ParseTuning {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Gameplay tuning from `TUNING_PATH`, or the built-in defaults.
pub fn load_tuning() -> Result<Tuning, ConfigError> {
    match tuning_path() {
        Some(path) => load_tuning_from(&path),
        None => Ok(Tuning::default()),
    }
}

pub fn load_tuning_from(path: &Path) -> Result<Tuning, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadTuning {
        path: path.to_path_buf(),
        source,
    })?;
    Tuning::from_toml_str(&text).map_err(|source| ConfigError::ParseTuning {
        path: path.to_path_buf(),
        source,
    })
}

// Called on startup, after edits (debounced) and on quit; keeps the session settings so the next
// run picks up where this one left off.
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};

use super::settings::{SettingsError, UserSettings};

const APP_DIR: &str = ".endless-ambient";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "endless-ambient.log";

pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

// <session_dir>/.endless-ambient
pub fn app_dir(session_dir: &Path) -> PathBuf {
    session_dir.join(APP_DIR)
}

// <session_dir>/.endless-ambient/settings.json
pub fn settings_file_path(session_dir: &Path) -> PathBuf {
    app_dir(session_dir).join(SETTINGS_FILE)
}

pub fn log_file_path(session_dir: &Path) -> PathBuf {
    app_dir(session_dir).join(LOG_FILE)
}

/// None covers "never saved", unreadable and malformed alike.
pub fn load_settings(session_dir: &Path) -> Option<UserSettings> {
    let path = settings_file_path(session_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("couldn't read {}: {e}", path.display());
            return None;
        }
    };
    match UserSettings::parse(&data) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("ignoring saved settings: {e}");
            None
        }
    }
}

/// Stamps the record with the save time and writes it, making the folder if needed.
pub fn save_settings(session_dir: &Path, settings: &UserSettings) -> Result<(), SettingsError> {
    let path = settings_file_path(session_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io { path: parent.to_path_buf(), source })?;
    }
    let mut stamped = settings.clone();
    stamped.last_saved_timestamp = Some(Utc::now());
    let json = serde_json::to_string_pretty(&stamped)?;
    std::fs::write(&path, json).map_err(|source| SettingsError::Io { path: path.clone(), source })?;
    debug!("settings saved to {}", path.display());
    Ok(())
}

pub fn clear_settings(session_dir: &Path) -> Result<(), SettingsError> {
    let path = settings_file_path(session_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SettingsError::Io { path, source }),
    }
}

/// Coalesces bursts of edits into one write. Each `schedule` pushes the deadline back.
#[derive(Debug)]
pub struct DebouncedSaver {
    delay: Duration,
    due: Option<Instant>,
    pending: Option<UserSettings>,
}

impl Default for DebouncedSaver {
    fn default() -> Self {
        Self::new(SAVE_DEBOUNCE)
    }
}

impl DebouncedSaver {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None, pending: None }
    }

    pub fn schedule(&mut self, settings: UserSettings, now: Instant) {
        self.pending = Some(settings);
        self.due = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The record to write, once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<UserSettings> {
        match self.due {
            Some(due) if now >= due => self.flush(),
            _ => None,
        }
    }

    /// Whatever is pending, deadline or not.
    pub fn flush(&mut self) -> Option<UserSettings> {
        self.due = None;
        self.pending.take()
    }
}

use super::write_json;
use crate::model::{SendMode, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SETTINGS_FILE: &str = "fwd_settings.json";

/// Singleton record of the two scheduling parameters.
///
/// The scheduler re-reads this every cycle; admin handlers mutate it
/// out-of-band, so callers must never cache the values.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `fwd_settings.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SETTINGS_FILE))
    }

    /// Read current settings; a missing or corrupt file is initialized with
    /// defaults (`repeat`, 1800s) first.
    fn load(&self) -> Settings {
        if let Ok(raw) = fs::read_to_string(&self.path) {
            match serde_json::from_str(&raw) {
                Ok(settings) => return settings,
                Err(err) => {
                    warn!(?err, path = %self.path.display(), "corrupt settings file; resetting to defaults");
                }
            }
        }
        let defaults = Settings::default();
        write_json(&self.path, &defaults);
        defaults
    }

    pub fn send_mode(&self) -> SendMode {
        self.load().send_mode
    }

    pub fn set_send_mode(&self, mode: SendMode) {
        let mut settings = self.load();
        settings.send_mode = mode;
        write_json(&self.path, &settings);
    }

    pub fn interval(&self) -> u64 {
        self.load().interval
    }

    pub fn set_interval(&self, seconds: u64) {
        let mut settings = self.load();
        settings.interval = seconds;
        write_json(&self.path, &settings);
    }
}

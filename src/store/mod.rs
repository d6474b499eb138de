//! Flat-file JSON stores for posts, destinations and scheduling settings.
//!
//! Every mutating operation is a full read-modify-write of one small JSON
//! file. A missing or corrupt file reads as an empty store; a failed write is
//! logged and swallowed (best-effort persistence). This keeps each public
//! operation atomic from the caller's point of view but is a known scale
//! limit for large collections.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

mod dests;
mod posts;
mod settings;

pub use dests::DestStore;
pub use posts::PostStore;
pub use settings::SettingsStore;

/// Read a whole store file, falling back to `T::default()` on any failure.
fn read_json<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, path = %path.display(), "unreadable store file; treating as empty");
            }
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(?err, path = %path.display(), "corrupt store file; treating as empty");
            T::default()
        }
    }
}

/// Write a whole store file. Failures are logged and swallowed.
fn write_json<T: Serialize>(path: &Path, value: &T) {
    let raw = match serde_json::to_string_pretty(value) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(?err, path = %path.display(), "failed to serialize store file");
            return;
        }
    };
    if let Err(err) = fs::write(path, raw) {
        warn!(?err, path = %path.display(), "failed to persist store file");
    }
}

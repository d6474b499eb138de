use super::{read_json, write_json};
use crate::model::Destination;
use std::path::{Path, PathBuf};

pub const DESTS_FILE: &str = "fwd_dests.json";

/// Durable record of forwarding targets, unique by `chat_id`.
#[derive(Debug, Clone)]
pub struct DestStore {
    path: PathBuf,
}

impl DestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `fwd_dests.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DESTS_FILE))
    }

    fn load(&self) -> Vec<Destination> {
        read_json(&self.path)
    }

    /// Add a destination. Returns false (store unchanged) when the id is
    /// already present; titles are never updated in place.
    pub fn add(&self, chat_id: i64, title: &str) -> bool {
        let mut dests = self.load();
        if dests.iter().any(|d| d.chat_id == chat_id) {
            return false;
        }
        dests.push(Destination {
            chat_id,
            title: title.to_string(),
        });
        write_json(&self.path, &dests);
        true
    }

    /// Remove a destination. Returns false when no such id exists.
    pub fn remove(&self, chat_id: i64) -> bool {
        let dests = self.load();
        let remaining: Vec<Destination> =
            dests.iter().filter(|d| d.chat_id != chat_id).cloned().collect();
        if remaining.len() == dests.len() {
            return false;
        }
        write_json(&self.path, &remaining);
        true
    }

    pub fn list(&self) -> Vec<Destination> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_rejects_duplicate_chat_id() {
        let td = tempdir().unwrap();
        let store = DestStore::in_dir(td.path());

        assert!(store.add(-100123, "Group A"));
        assert!(!store.add(-100123, "Renamed"));

        let dests = store.list();
        assert_eq!(dests.len(), 1);
        assert_eq!(dests[0].title, "Group A");
    }

    #[test]
    fn remove_missing_returns_false() {
        let td = tempdir().unwrap();
        let store = DestStore::in_dir(td.path());
        store.add(-100123, "Group A");

        assert!(!store.remove(-100999));
        assert_eq!(store.list().len(), 1);

        assert!(store.remove(-100123));
        assert!(store.list().is_empty());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let td = tempdir().unwrap();
        let path = td.path().join(DESTS_FILE);
        std::fs::write(&path, "[[[").unwrap();

        let store = DestStore::new(&path);
        assert!(store.list().is_empty());
        assert!(store.add(-1, "G"));
        assert_eq!(store.list().len(), 1);
    }
}

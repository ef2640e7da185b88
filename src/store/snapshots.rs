use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::write_atomically;

/// Raw week payloads exactly as last fetched, one JSON file per week.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    pub fn path_for(&self, period: u32) -> PathBuf {
        self.dir.join(format!("matches_week_{}.json", period))
    }

    pub fn exists(&self, period: u32) -> bool {
        self.path_for(period).is_file()
    }

    /// Replace the week's snapshot with `payload`.
    pub fn save(&self, period: u32, payload: &Value) -> Result<PathBuf> {
        let path = self.path_for(period);
        let body = serde_json::to_vec_pretty(payload).context("Failed to encode snapshot")?;
        write_atomically(&path, &body)?;
        Ok(path)
    }

    /// The week's snapshot, or `None` if it was never saved.
    pub fn load(&self, period: u32) -> Result<Option<Value>> {
        let path = self.path_for(period);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let value = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_load_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("json"));
        let payload = json!({ "matches": [{ "date": "2025-08-17T19:00:00Z" }] });

        assert!(!store.exists(2));
        assert_eq!(store.load(2).unwrap(), None);

        let path = store.save(2, &payload).unwrap();
        assert!(path.ends_with("json/matches_week_2.json"));
        assert!(store.exists(2));
        assert_eq!(store.load(2).unwrap(), Some(payload));
    }

    #[test]
    fn test_save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save(1, &json!({ "matches": [1, 2, 3] })).unwrap();
        store.save(1, &json!({ "matches": [] })).unwrap();
        assert_eq!(store.load(1).unwrap(), Some(json!({ "matches": [] })));
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.path_for(6), "{ truncated").unwrap();

        assert!(store.exists(6));
        assert!(store.load(6).is_err());
    }
}

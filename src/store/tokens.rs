use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::write_atomically;

/// `Last-Modified` values per week, one small text file each.
///
/// Writes are keyed per week and a source's weeks are processed one at a
/// time, so no locking is needed.
#[derive(Debug, Clone)]
pub struct PeriodCache {
    dir: PathBuf,
}

impl PeriodCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PeriodCache { dir: dir.into() }
    }

    pub fn path_for(&self, period: u32) -> PathBuf {
        self.dir.join(format!("week_{}.lastmod", period))
    }

    /// The stored token, or `None` if this week was never fetched.
    pub fn load(&self, period: u32) -> Result<Option<String>> {
        read_token(&self.path_for(period))
    }

    pub fn save(&self, period: u32, token: &str) -> Result<()> {
        write_atomically(&self.path_for(period), token.trim().as_bytes())
    }
}

fn read_token(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let token = raw.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeriodCache::new(dir.path().join("meta"));
        assert_eq!(cache.load(4).unwrap(), None);
    }

    #[test]
    fn test_save_then_load_trims() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeriodCache::new(dir.path().join("meta"));

        cache.save(4, "  Wed, 13 Aug 2025 10:00:00 GMT\n").unwrap();
        assert_eq!(
            fs::read_to_string(cache.path_for(4)).unwrap(),
            "Wed, 13 Aug 2025 10:00:00 GMT"
        );
        assert_eq!(
            cache.load(4).unwrap().as_deref(),
            Some("Wed, 13 Aug 2025 10:00:00 GMT")
        );
        assert_eq!(cache.load(5).unwrap(), None);
    }

    #[test]
    fn test_hand_edited_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeriodCache::new(dir.path());
        fs::write(cache.path_for(1), "\n  token-1 \n").unwrap();
        assert_eq!(cache.load(1).unwrap().as_deref(), Some("token-1"));

        fs::write(cache.path_for(2), "   \n").unwrap();
        assert_eq!(cache.load(2).unwrap(), None);
    }
}

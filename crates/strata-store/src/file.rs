//! File-backed store
//!
//! Each key maps to `<dir>/<encoded key>.json`. Writes go to a temp file in
//! the same directory and are renamed over the target, so a crash mid-write
//! leaves either the old or the new envelope, never a torn one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Directory of one-file-per-key entries
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create store rooted at `dir` (created lazily on first write)
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(key, e))?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(key, e))?;
        temp.write_all(value.as_bytes())
            .map_err(|e| StoreError::io(key, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(key, e))?;
        temp.persist(self.path_for(key))
            .map_err(|e| StoreError::io(key, e.error))?;

        tracing::trace!("wrote {} bytes for key {}", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }
}

/// Map a key onto a portable file stem
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_xx`
/// (lowercase hex), so distinct keys never share a file. The empty key is `_`.
fn encode_key(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }

    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push('_');
            stem.push_str(&hex::encode([byte]));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_key_escapes_reserved_bytes() {
        assert_eq!(encode_key("app-state"), "app-state");
        assert_eq!(encode_key("a/b"), "a_2fb");
        assert_eq!(encode_key("a_b"), "a_5fb");
        assert_eq!(encode_key(".."), "_2e_2e");
        assert_eq!(encode_key(""), "_");
        assert_eq!(encode_key("é"), "_c3_a9");
    }

    #[test]
    fn distinct_keys_never_share_a_file() {
        let store = FileStore::new("/tmp/strata");
        let keys = ["a/b", "a_b", "a b", "a.b", "a\\b", "ab", ""];
        let paths: std::collections::HashSet<_> = keys.iter().map(|k| store.path_for(k)).collect();
        assert_eq!(paths.len(), keys.len());
    }

    #[test]
    fn path_for_stays_in_dir() {
        let store = FileStore::new("/tmp/strata");
        let path = store.path_for("../escape");
        assert_eq!(path.parent(), Some(Path::new("/tmp/strata")));
    }
}

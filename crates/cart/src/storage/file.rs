//! Filesystem-backed storage (one JSON file per key).

use std::fmt::Write as _;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{KeyValueStore, StorageError};

/// Store values as JSON files under a directory.
///
/// Each write goes to its own uniquely named temporary file that is renamed
/// over the target, so a reader sees either the old or the new snapshot and
/// concurrent writers to the same key end up last-write-wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Encode a key as a file name.
///
/// ASCII letters, digits, `-` and `.` are kept; every other byte (including
/// `_`) becomes `_XX` in hex, so distinct keys never share a file.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "_{byte:02X}");
        }
    }
    stem
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        // Dropping the temp file on an early return removes it.
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|err| StorageError::Io(err.error))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert_eq!(store.get("@storefront:cart").unwrap(), None);
    }

    #[test]
    fn test_set_then_get_survives_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.set("@storefront:cart", r#"[{"id":1}]"#).unwrap();
        store.set("@storefront:cart", "[]").unwrap();

        let reopened = FileStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("@storefront:cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_key_is_sanitized_and_no_temp_file_left() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.set("@storefront:cart", "[]").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["_40storefront_3Acart.json".to_string()]);
    }

    #[test]
    fn test_distinct_keys_never_share_a_file() {
        assert_ne!(file_stem("@a:b"), file_stem("_a_b"));
        assert_eq!(file_stem("_a_b"), "_5Fa_5Fb");
        assert_eq!(file_stem("cart-2.v1"), "cart-2.v1");

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.set("@a:b", "first").unwrap();
        store.set("_a_b", "second").unwrap();
        assert_eq!(store.get("@a:b").unwrap().as_deref(), Some("first"));
        assert_eq!(store.get("_a_b").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_concurrent_writers_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStore::new(dir.path()).unwrap();
        let second = FileStore::new(dir.path()).unwrap();

        for round in 0..50 {
            let a = format!("[{{\"writer\":\"a\",\"round\":{round}}}]");
            let b = format!("[{{\"writer\":\"b\",\"round\":{round}}}]");

            let (ra, rb) = std::thread::scope(|scope| {
                let ha = scope.spawn(|| first.set("@storefront:cart", &a));
                let hb = scope.spawn(|| second.set("@storefront:cart", &b));
                (ha.join().unwrap(), hb.join().unwrap())
            });
            ra.unwrap();
            rb.unwrap();

            let saved = first.get("@storefront:cart").unwrap().unwrap();
            assert!(saved == a || saved == b, "torn snapshot: {saved}");
        }

        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(&nested).unwrap();
        assert!(store.dir().is_dir());
    }
}

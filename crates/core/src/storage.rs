//! Durable key-value collaborator for patient snapshots.
//!
//! The store only ever needs two operations on a single key: read the whole value, or
//! replace it. [`KeyValueStore`] captures exactly that, so the store can be run against
//! memory in tests and against files on disk in the binary.

use crate::constants::SNAPSHOT_FILE_EXTENSION;
use crate::validation::validate_storage_key;
use crate::{PatientError, PatientResult};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A string-valued key-value store.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, or `None` when nothing has been written yet.
    fn get(&self, key: &str) -> PatientResult<Option<String>>;

    /// Replaces the value stored under `key`. Either the whole value lands or the call fails.
    fn set(&mut self, key: &str, value: &str) -> PatientResult<()>;
}

/// In-memory storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one value, e.g. a snapshot written by an older front end.
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.into());
        Self { entries }
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> PatientResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PatientResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed storage: one `<key>.json` file per key under a data directory.
///
/// Writes go to a sibling temporary file which is then renamed over the target, so a
/// reader sees either the previous value or the new one.
#[derive(Clone, Debug)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the data directory.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::StorageDirCreation`] if the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> PatientResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(PatientError::StorageDirCreation)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file holding `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if `key` could escape the data directory.
    pub fn path_for(&self, key: &str) -> PatientResult<PathBuf> {
        validate_storage_key(key)?;
        Ok(self
            .data_dir
            .join(format!("{key}.{SNAPSHOT_FILE_EXTENSION}")))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> PatientResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PatientError::FileRead(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> PatientResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{SNAPSHOT_FILE_EXTENSION}.tmp"));

        fs::write(&tmp, value).map_err(PatientError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(PatientError::FileWrite(e));
        }

        tracing::debug!(path = %path.display(), bytes = value.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_storage_get_set() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "[1]").unwrap();
        storage.set("k", "[2]").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("[2]"));
        assert_eq!(storage.get("other").unwrap(), None);
    }

    #[test]
    fn file_storage_missing_key_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();
        assert_eq!(storage.get("orthomed-patients").unwrap(), None);
    }

    #[test]
    fn file_storage_round_trip_and_overwrite() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path().join("nested/data")).unwrap();

        storage.set("orthomed-patients", "[]").unwrap();
        storage.set("orthomed-patients", "[{}]").unwrap();

        assert_eq!(
            storage.get("orthomed-patients").unwrap().as_deref(),
            Some("[{}]")
        );
        let on_disk = temp.path().join("nested/data/orthomed-patients.json");
        assert_eq!(fs::read_to_string(on_disk).unwrap(), "[{}]");
        assert!(!temp
            .path()
            .join("nested/data/orthomed-patients.json.tmp")
            .exists());
    }

    #[test]
    fn file_storage_rejects_escaping_key() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();
        assert!(matches!(
            storage.set("../outside", "[]"),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(storage.get("a/b").is_err());
    }

    #[test]
    fn file_storage_read_error_propagates() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();
        fs::create_dir(temp.path().join("dir-key.json")).unwrap();
        assert!(matches!(
            storage.get("dir-key"),
            Err(PatientError::FileRead(_))
        ));
    }
}

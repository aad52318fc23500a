//! File-backed key-value store adapter
//!
//! Each key path maps to a directory under a root, and each field to a
//! file in that directory holding the value as UTF-8 text. External
//! monitors read the files directly.
//!
//! ```text
//! <root>/Software/HWiNFO64/Sensors/Custom/PC Water Sensor/Temp0/
//!     Name    "Temperature"
//!     Value   "23.5"
//! ```
//!
//! Values are written to a temp file in the same directory and renamed
//! into place, so a reader never sees a half-written value.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::key_segments;
use crate::ports::sink::{KeyValueSink, SinkError};

/// Directory-per-key, file-per-field store
#[derive(Debug)]
pub struct FileKeyValueStore {
    /// Directory for the opened key path
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create (if needed) and open `key_path` under `root`
    pub fn open(root: &Path, key_path: &str) -> Result<Self, SinkError> {
        let mut dir = root.to_path_buf();
        let mut segments = 0;
        for segment in key_segments(key_path) {
            if segment == "." || segment == ".." {
                return Err(SinkError::Open {
                    path: key_path.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "key path must not contain '.' or '..'",
                    ),
                });
            }
            dir.push(segment);
            segments += 1;
        }
        if segments == 0 {
            return Err(SinkError::Open {
                path: key_path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty key path"),
            });
        }

        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Open {
            path: dir.display().to_string(),
            source,
        })?;

        Ok(Self { dir })
    }

    /// Directory holding the fields
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a field back, `None` if it was never written
    pub fn get(&self, field: &str) -> Result<Option<String>, SinkError> {
        let path = self.field_path(field)?;
        match std::fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SinkError::Read {
                field: field.to_string(),
                source,
            }),
        }
    }

    fn field_path(&self, field: &str) -> Result<PathBuf, SinkError> {
        let valid = !field.is_empty()
            && field != "."
            && field != ".."
            && !field.contains(['/', '\\'])
            && !field.starts_with('.');
        if !valid {
            return Err(SinkError::InvalidField(field.to_string()));
        }
        Ok(self.dir.join(field))
    }
}

impl KeyValueSink for FileKeyValueStore {
    fn set(&mut self, field: &str, value: &str) -> Result<(), SinkError> {
        let path = self.field_path(field)?;
        let write_err = |source| SinkError::Write {
            field: field.to_string(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp.write_all(value.as_bytes()).map_err(write_err)?;
        temp.persist(&path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), value, "Field written");
        Ok(())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

impl Drop for FileKeyValueStore {
    fn drop(&mut self) {
        debug!(dir = %self.dir.display(), "Key-value store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_key_path() {
        let root = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(root.path(), r"Software\Sensors/Custom\Temp0").unwrap();
        assert!(store.dir().is_dir());
        assert_eq!(
            store.dir(),
            root.path().join("Software").join("Sensors").join("Custom").join("Temp0")
        );
    }

    #[test]
    fn test_set_and_overwrite() {
        let root = tempfile::tempdir().unwrap();
        let mut store = FileKeyValueStore::open(root.path(), "Custom/Temp0").unwrap();
        assert_eq!(store.get("Value").unwrap(), None);

        store.set("Value", "23.5").unwrap();
        store.set("Value", "24.0").unwrap();
        assert_eq!(store.get("Value").unwrap().as_deref(), Some("24.0"));
        assert_eq!(
            std::fs::read_to_string(store.dir().join("Value")).unwrap(),
            "24.0"
        );

        // No temp files left behind
        let entries = std::fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_reopen_existing_key() {
        let root = tempfile::tempdir().unwrap();
        FileKeyValueStore::open(root.path(), "Temp0")
            .unwrap()
            .set("Name", "Temperature")
            .unwrap();
        let store = FileKeyValueStore::open(root.path(), "Temp0").unwrap();
        assert_eq!(store.get("Name").unwrap().as_deref(), Some("Temperature"));
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileKeyValueStore::open(root.path(), "a/../b"),
            Err(SinkError::Open { .. })
        ));
        assert!(matches!(
            FileKeyValueStore::open(root.path(), "  / "),
            Err(SinkError::Open { .. })
        ));

        let mut store = FileKeyValueStore::open(root.path(), "Temp0").unwrap();
        for field in ["", "..", "a/b", r"a\b", ".hidden"] {
            assert!(matches!(store.set(field, "1"), Err(SinkError::InvalidField(_))));
        }
    }

    #[test]
    fn test_open_fails_when_root_is_a_file() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("blocker");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            FileKeyValueStore::open(&file, "Temp0"),
            Err(SinkError::Open { .. })
        ));
    }

    #[test]
    fn test_unreadable_field_is_a_read_error() {
        let root = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(root.path(), "Temp0").unwrap();
        std::fs::create_dir(store.dir().join("Value")).unwrap();
        assert!(matches!(store.get("Value"), Err(SinkError::Read { field, .. }) if field == "Value"));
    }
}

use std::path::PathBuf;

use super::{FileStore, StorageError, check_suite_name};

/// Preference-file backed storage under the app's data directory.
///
/// Preference files are created on first write, so only an unusable name
/// fails here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidStorage {
    data_dir: PathBuf,
}

impl AndroidStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn preferences(&self, name: &str) -> Result<FileStore, StorageError> {
        check_suite_name(name)?;
        Ok(FileStore::new(
            self.data_dir
                .join("shared_prefs")
                .join(urlencoding::encode(name).as_ref()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_are_created_on_first_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let prefs = AndroidStorage::new(dir.path()).preferences("clock").unwrap();
        assert!(!prefs.dir().exists());
        prefs.set("k", "v").unwrap();
        assert!(dir.path().join("shared_prefs/clock/k.value").is_file());
    }
}

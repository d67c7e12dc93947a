use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::StorageError;

const VALUE_SUFFIX: &str = ".value";
const RELOAD_MARKER: &str = ".reload";

/// A key/value store backed by one file per key inside a directory.
///
/// Each write lands in a temporary file that is renamed over the key's file,
/// so readers see either the old or the new value and concurrent writers to
/// the same key resolve to whichever rename happened last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{VALUE_SUFFIX}", urlencoding::encode(key)))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_atomically(&self.key_path(key), value)
    }

    /// Returns `None` for keys that were never set or have been removed.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        read_optional(&self.key_path(key))
    }

    /// Removing a missing key succeeds.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StorageError::io(path, e)),
            _ => Ok(()),
        }
    }

    /// Records a reload request stamped with the current time.
    pub fn request_reload(&self) -> Result<OffsetDateTime, StorageError> {
        let now = OffsetDateTime::now_utc();
        let stamp = now
            .format(&Rfc3339)
            .map_err(|e| StorageError::io(self.dir.join(RELOAD_MARKER), io::Error::other(e)))?;
        self.write_atomically(&self.dir.join(RELOAD_MARKER), &stamp)?;
        Ok(now)
    }

    /// The time of the most recent unacknowledged reload request.
    pub fn pending_reload(&self) -> Result<Option<OffsetDateTime>, StorageError> {
        let path = self.dir.join(RELOAD_MARKER);
        let Some(stamp) = read_optional(&path)? else {
            return Ok(None);
        };
        OffsetDateTime::parse(stamp.trim(), &Rfc3339)
            .map(Some)
            .map_err(|e| StorageError::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    pub fn acknowledge_reload(&self) -> Result<(), StorageError> {
        let path = self.dir.join(RELOAD_MARKER);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StorageError::io(path, e)),
            _ => Ok(()),
        }
    }

    fn write_atomically(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let staging = self.dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));
        fs::write(&staging, contents).map_err(|e| StorageError::io(&staging, e))?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(StorageError::io(path, e));
        }
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

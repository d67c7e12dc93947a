use std::path::PathBuf;

use super::{FileStore, StorageError, check_suite_name};

/// App-group backed storage.
///
/// Each suite lives in the app-group container of the same name under the
/// container root. Containers are provisioned by the OS from the app-group
/// entitlement, so a missing one is reported rather than created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosStorage {
    container_root: PathBuf,
}

/// Suite shared with a widget: `group.<widget>`.
pub fn suite_for_widget(widget: &str) -> String {
    format!("group.{widget}")
}

impl IosStorage {
    pub fn new(container_root: impl Into<PathBuf>) -> Self {
        Self {
            container_root: container_root.into(),
        }
    }

    pub fn suite(&self, suite: &str) -> Result<FileStore, StorageError> {
        check_suite_name(suite)?;
        let container = self.container_root.join(suite);
        if !container.is_dir() {
            return Err(StorageError::ContainerUnavailable {
                suite: suite.to_string(),
                container,
            });
        }
        Ok(FileStore::new(container.join("Library/Preferences").join(suite)))
    }
}

//! Runtime key/value bridge between a host app and its extensions.
//!
//! The platform is chosen once, when the bridge is constructed, and carried as
//! an explicit variant. Call sites never inspect the running process to decide
//! which storage shape to use.
//!
//! ```no_run
//! use apptargets_sdk::storage::StorageBridge;
//!
//! let bridge = StorageBridge::ios("/private/var/mobile/Containers/Shared/AppGroup");
//! bridge.set("clock", "timezone", "Europe/Berlin")?;
//! bridge.refresh("clock")?;
//! # Ok::<(), apptargets_sdk::storage::StorageError>(())
//! ```

mod android;
mod ios;
mod store;

use std::path::{Path, PathBuf};

use time::OffsetDateTime;

pub use android::AndroidStorage;
pub use ios::{IosStorage, suite_for_widget};
pub use store::FileStore;

use crate::types::Platform;

/// Failures surfaced by storage operations. There are no retries.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The shared container for a suite does not exist, usually because the
    /// app-group entitlement is missing from the signed app.
    #[error(
        "shared container for suite '{suite}' is unavailable at {}. \
         Check that the app group entitlement is present",
        container.display()
    )]
    ContainerUnavailable { suite: String, container: PathBuf },

    /// The name cannot be used as a single directory name inside the container.
    #[error("invalid suite name '{suite}': names must be non-empty path components")]
    InvalidSuite { suite: String },

    #[error("storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejects names that would leave the container when joined as a path component.
pub(crate) fn check_suite_name(suite: &str) -> Result<(), StorageError> {
    let escapes = suite.is_empty()
        || suite == "."
        || suite == ".."
        || suite.contains(['/', '\\', '\0']);
    if escapes {
        return Err(StorageError::InvalidSuite {
            suite: suite.to_string(),
        });
    }
    Ok(())
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// The storage bridge for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBridge {
    Ios(IosStorage),
    Android(AndroidStorage),
}

impl StorageBridge {
    /// iOS bridge rooted at the directory holding app-group containers.
    pub fn ios(container_root: impl Into<PathBuf>) -> Self {
        StorageBridge::Ios(IosStorage::new(container_root))
    }

    /// Android bridge rooted at the app's data directory.
    pub fn android(data_dir: impl Into<PathBuf>) -> Self {
        StorageBridge::Android(AndroidStorage::new(data_dir))
    }

    /// Builds the bridge for `platform` over `root`.
    pub fn for_platform(platform: Platform, root: &Path) -> Self {
        match platform {
            Platform::Ios => Self::ios(root),
            Platform::Android => Self::android(root),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            StorageBridge::Ios(_) => Platform::Ios,
            StorageBridge::Android(_) => Platform::Android,
        }
    }

    /// Store for an explicitly named suite (iOS) or preference file (Android).
    pub fn suite(&self, suite: &str) -> Result<FileStore, StorageError> {
        match self {
            StorageBridge::Ios(ios) => ios.suite(suite),
            StorageBridge::Android(android) => android.preferences(suite),
        }
    }

    /// Store shared with the named widget.
    pub fn widget(&self, widget: &str) -> Result<FileStore, StorageError> {
        match self {
            StorageBridge::Ios(ios) => ios.suite(&suite_for_widget(widget)),
            StorageBridge::Android(android) => android.preferences(widget),
        }
    }

    pub fn set(&self, widget: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.widget(widget)?.set(key, value)
    }

    pub fn get(&self, widget: &str, key: &str) -> Result<Option<String>, StorageError> {
        self.widget(widget)?.get(key)
    }

    pub fn remove(&self, widget: &str, key: &str) -> Result<(), StorageError> {
        self.widget(widget)?.remove(key)
    }

    /// Asks the extension to redraw. On iOS this stands in for a timeline
    /// reload, on Android for a widget update broadcast.
    pub fn refresh(&self, widget: &str) -> Result<bool, StorageError> {
        let requested = self.widget(widget)?.request_reload()?;
        tracing::debug!(widget, platform = %self.platform(), %requested, "requested reload");
        Ok(true)
    }

    /// Read by the extension side: when the last unacknowledged refresh was
    /// requested.
    pub fn pending_reload(&self, widget: &str) -> Result<Option<OffsetDateTime>, StorageError> {
        self.widget(widget)?.pending_reload()
    }

    pub fn acknowledge_reload(&self, widget: &str) -> Result<(), StorageError> {
        self.widget(widget)?.acknowledge_reload()
    }
}

//! Shared key/value storage for a host app and its extensions, exported through
//! UniFFI (proc macro mode) for Swift and Kotlin.

use apptargets_sdk::storage::{StorageBridge, StorageError};
use apptargets_sdk::Platform;
use std::path::Path;

/// Platform whose storage layout the bridge uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum BridgePlatform {
    Ios,
    Android,
}

impl From<BridgePlatform> for Platform {
    fn from(platform: BridgePlatform) -> Self {
        match platform {
            BridgePlatform::Ios => Platform::Ios,
            BridgePlatform::Android => Platform::Android,
        }
    }
}

/// Error types for storage operations.
#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum BridgeError {
    #[error("shared container unavailable for suite {suite}")]
    ContainerUnavailable { suite: String },

    #[error("invalid suite name {suite}")]
    InvalidSuite { suite: String },

    #[error("storage I/O failed: {reason}")]
    Io { reason: String },
}

impl From<StorageError> for BridgeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ContainerUnavailable { suite, .. } => {
                BridgeError::ContainerUnavailable { suite }
            }
            StorageError::InvalidSuite { suite } => BridgeError::InvalidSuite { suite },
            io @ StorageError::Io { .. } => BridgeError::Io {
                reason: io.to_string(),
            },
        }
    }
}

// Generate UniFFI scaffolding from proc macros
uniffi::setup_scaffolding!();

/// Storage handle held by the host app or an extension process.
///
/// `root` is the app-group container root on iOS and the app's data
/// directory on Android.
#[derive(Debug, uniffi::Object)]
pub struct TargetStorage {
    bridge: StorageBridge,
}

#[uniffi::export]
impl TargetStorage {
    #[uniffi::constructor]
    pub fn new(platform: BridgePlatform, root: String) -> Self {
        Self {
            bridge: StorageBridge::for_platform(platform.into(), Path::new(&root)),
        }
    }

    pub fn platform(&self) -> BridgePlatform {
        match self.bridge.platform() {
            Platform::Ios => BridgePlatform::Ios,
            Platform::Android => BridgePlatform::Android,
        }
    }

    /// Stores `value` under `key` in an explicitly named suite.
    pub fn set_string(&self, key: String, value: String, suite: String) -> Result<(), BridgeError> {
        Ok(self.bridge.suite(&suite)?.set(&key, &value)?)
    }

    pub fn get(&self, key: String, suite: String) -> Result<Option<String>, BridgeError> {
        Ok(self.bridge.suite(&suite)?.get(&key)?)
    }

    pub fn remove(&self, key: String, suite: String) -> Result<(), BridgeError> {
        Ok(self.bridge.suite(&suite)?.remove(&key)?)
    }

    /// Stores `value` in the store shared with `widget`.
    pub fn set_for_widget(
        &self,
        widget: String,
        key: String,
        value: String,
    ) -> Result<(), BridgeError> {
        Ok(self.bridge.set(&widget, &key, &value)?)
    }

    pub fn get_for_widget(&self, widget: String, key: String) -> Result<Option<String>, BridgeError> {
        Ok(self.bridge.get(&widget, &key)?)
    }

    pub fn remove_for_widget(&self, widget: String, key: String) -> Result<(), BridgeError> {
        Ok(self.bridge.remove(&widget, &key)?)
    }

    /// Requests a timeline reload (iOS) or widget update (Android).
    pub fn refresh(&self, widget: String) -> Result<bool, BridgeError> {
        Ok(self.bridge.refresh(&widget)?)
    }

    /// Same as [`TargetStorage::refresh`], for non-widget targets.
    pub fn refresh_target(&self, target: String) -> Result<bool, BridgeError> {
        self.refresh(target)
    }

    /// Unix timestamp of the last unacknowledged refresh request.
    pub fn pending_reload(&self, widget: String) -> Result<Option<i64>, BridgeError> {
        Ok(self
            .bridge
            .pending_reload(&widget)?
            .map(|requested| requested.unix_timestamp()))
    }

    pub fn acknowledge_reload(&self, widget: String) -> Result<(), BridgeError> {
        Ok(self.bridge.acknowledge_reload(&widget)?)
    }
}

//! The host app's resolved configuration.
//!
//! Targets derive bundle identifiers, team ids and entitlements from the app that
//! embeds them. The configuration is read from `app.json`, either at the top level
//! or wrapped in an `expo` key, and unknown keys survive a load/save round trip.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entitlements::Entitlements;
use crate::types::TargetsError;

/// Resolved configuration of the app hosting the targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAppConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub ios: IosHostConfig,
    #[serde(default)]
    pub android: AndroidHostConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosHostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple_team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Entitlements::is_empty")]
    pub entitlements: Entitlements,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidHostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HostAppConfig {
    /// Creates a minimal host configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the iOS bundle identifier.
    pub fn with_bundle_identifier(mut self, bundle_identifier: impl Into<String>) -> Self {
        self.ios.bundle_identifier = Some(bundle_identifier.into());
        self
    }

    /// Sets the Android package.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.android.package = Some(package.into());
        self
    }

    /// Parses an `app.json` document, unwrapping a top-level `expo` key if present.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        let mut value: Value = serde_json::from_str(contents)?;
        let wrapped = value.get_mut("expo").map(Value::take);
        if let Some(inner) = wrapped {
            value = inner;
        }
        serde_json::from_value(value)
    }

    /// Loads the host configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, TargetsError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| TargetsError::io(path, e))?;
        Self::from_json_str(&contents).map_err(|e| TargetsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Xcode product name of the host app.
    pub fn product_name(&self) -> String {
        crate::descriptor::sanitize(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlements::EntitlementValue;

    #[test]
    fn unwraps_expo_key_and_keeps_unknown_fields() {
        let json = r#"{
            "expo": {
                "name": "My App",
                "version": "1.2.0",
                "ios": {
                    "bundleIdentifier": "com.example.app",
                    "entitlements": {
                        "com.apple.security.application-groups": ["group.shared"],
                        "aps-environment": "development"
                    },
                    "supportsTablet": true
                },
                "android": { "package": "com.example.app" }
            }
        }"#;
        let config = HostAppConfig::from_json_str(json).unwrap();
        assert_eq!(config.name, "My App");
        assert_eq!(config.ios.bundle_identifier.as_deref(), Some("com.example.app"));
        assert_eq!(config.android.package.as_deref(), Some("com.example.app"));
        assert_eq!(config.extra["version"], "1.2.0");
        assert_eq!(config.ios.extra["supportsTablet"], true);
        assert_eq!(
            config.ios.entitlements.get("aps-environment"),
            Some(&EntitlementValue::String("development".into()))
        );
        assert_eq!(config.product_name(), "MyApp");
    }

    #[test]
    fn plain_config_without_expo_key() {
        let config = HostAppConfig::from_json_str(r#"{"name": "Plain"}"#).unwrap();
        assert_eq!(config.name, "Plain");
        assert!(config.ios.bundle_identifier.is_none());
    }
}

//! Configuration file support for apptargets.
//!
//! This module provides support for `apptargets.toml` configuration files
//! that pin down where a project keeps its target descriptors, host config
//! and native project directories.
//!
//! ## Configuration File Location
//!
//! The CLI searches for `apptargets.toml` in:
//! 1. The current directory
//! 2. Parent directories, stopping at the repository root (`.git`)
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! targets_dir = "targets"
//! app_config = "app.json"
//!
//! [ios]
//! dir = "ios"
//! host_entitlements = "ios/HostApp/HostApp.entitlements"
//!
//! [android]
//! dir = "android"
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "apptargets.toml";

/// Root configuration structure for `apptargets.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApptargetsConfig {
    /// Project layout.
    pub project: ProjectConfig,

    /// iOS project settings.
    pub ios: IosConfig,

    /// Android project settings.
    pub android: AndroidConfig,
}

/// Project layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory containing one subdirectory per target.
    ///
    /// Defaults to `targets`.
    pub targets_dir: PathBuf,

    /// Host app configuration file.
    ///
    /// Defaults to `app.json`. A top-level `expo` key is unwrapped.
    pub app_config: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            targets_dir: PathBuf::from("targets"),
            app_config: PathBuf::from("app.json"),
        }
    }
}

/// iOS project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IosConfig {
    /// Directory holding the `.xcodeproj`.
    ///
    /// Defaults to `ios`.
    pub dir: PathBuf,

    /// Host entitlements file updated with the targets' app groups.
    ///
    /// Defaults to `<ios dir>/<HostProduct>/<HostProduct>.entitlements`.
    pub host_entitlements: Option<PathBuf>,
}

impl Default for IosConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("ios"),
            host_entitlements: None,
        }
    }
}

/// Android project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    /// Directory holding the Gradle project.
    ///
    /// Defaults to `android`.
    pub dir: PathBuf,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("android"),
        }
    }
}

impl ApptargetsConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: ApptargetsConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the current directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Generates a starter configuration file as a formatted TOML string.
    ///
    /// `host_product` is the sanitized host app name, used to suggest the
    /// host entitlements path.
    pub fn generate_starter_toml(host_product: &str) -> String {
        format!(
            r#"# apptargets configuration file
# CLI flags override these settings when provided.
# Relative paths are resolved against this file's directory.

[project]
# One subdirectory per target, each with a target.toml or target.json
targets_dir = "targets"

# Host app configuration (a top-level "expo" key is unwrapped)
app_config = "app.json"

[ios]
# Directory holding the .xcodeproj
dir = "ios"

# Host entitlements file that receives the targets' app groups
# (default: ios/<HostProduct>/<HostProduct>.entitlements)
# host_entitlements = "ios/{host_product}/{host_product}.entitlements"

[android]
# Directory holding the Gradle project
dir = "android"
"#,
            host_product = host_product,
        )
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<ApptargetsConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,

    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,
}

impl ConfigResolver {
    /// Creates a resolver by discovering configuration from `start_dir`.
    ///
    /// Without a config file, paths resolve against `start_dir`.
    pub fn discover_from(start_dir: &Path) -> Result<Self> {
        match ApptargetsConfig::discover_from(start_dir)? {
            Some((config, path)) => {
                let base_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| start_dir.to_path_buf());
                Ok(Self {
                    config: Some(config),
                    config_path: Some(path),
                    base_dir,
                })
            }
            None => Ok(Self {
                config: None,
                config_path: None,
                base_dir: start_dir.to_path_buf(),
            }),
        }
    }

    fn config_or_default(&self) -> ApptargetsConfig {
        self.config.clone().unwrap_or_default()
    }

    fn absolute(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// The resolved value prefers CLI over config over default.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&ApptargetsConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }

    pub fn targets_dir(&self, cli_value: Option<PathBuf>) -> PathBuf {
        let fallback = self.config_or_default().project.targets_dir;
        self.absolute(self.resolve(cli_value, |c| Some(c.project.targets_dir.clone()), fallback))
    }

    pub fn app_config(&self, cli_value: Option<PathBuf>) -> PathBuf {
        let fallback = self.config_or_default().project.app_config;
        self.absolute(self.resolve(cli_value, |c| Some(c.project.app_config.clone()), fallback))
    }

    pub fn ios_dir(&self, cli_value: Option<PathBuf>) -> PathBuf {
        let fallback = self.config_or_default().ios.dir;
        self.absolute(self.resolve(cli_value, |c| Some(c.ios.dir.clone()), fallback))
    }

    pub fn android_dir(&self, cli_value: Option<PathBuf>) -> PathBuf {
        let fallback = self.config_or_default().android.dir;
        self.absolute(self.resolve(cli_value, |c| Some(c.android.dir.clone()), fallback))
    }

    /// Explicit host entitlements path, if the CLI or config names one.
    pub fn host_entitlements(&self, cli_value: Option<PathBuf>) -> Option<PathBuf> {
        cli_value
            .or_else(|| {
                self.config
                    .as_ref()
                    .and_then(|c| c.ios.host_entitlements.clone())
            })
            .map(|path| self.absolute(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ApptargetsConfig::default();
        assert_eq!(config.project.targets_dir, PathBuf::from("targets"));
        assert_eq!(config.project.app_config, PathBuf::from("app.json"));
        assert_eq!(config.ios.dir, PathBuf::from("ios"));
        assert!(config.ios.host_entitlements.is_none());
        assert_eq!(config.android.dir, PathBuf::from("android"));
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &config_path,
            "[project]\ntargets_dir = \"native/targets\"\n\n[ios]\nhost_entitlements = \"x.entitlements\"\n",
        )
        .unwrap();

        let config = ApptargetsConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.project.targets_dir, PathBuf::from("native/targets"));
        assert_eq!(config.project.app_config, PathBuf::from("app.json"));
        assert_eq!(config.ios.dir, PathBuf::from("ios"));
        assert_eq!(
            config.ios.host_entitlements,
            Some(PathBuf::from("x.entitlements"))
        );
    }

    #[test]
    fn test_discover_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[android]\ndir = \"droid\"\n").unwrap();
        let nested = temp_dir.path().join("targets").join("widget");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = ApptargetsConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.android.dir, PathBuf::from("droid"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = ApptargetsConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_resolver_prefers_cli_and_anchors_paths() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[ios]\ndir = \"native/ios\"\n",
        )
        .unwrap();

        let resolver = ConfigResolver::discover_from(temp_dir.path()).unwrap();
        assert_eq!(resolver.ios_dir(None), temp_dir.path().join("native/ios"));
        assert_eq!(
            resolver.ios_dir(Some(PathBuf::from("/abs/ios"))),
            PathBuf::from("/abs/ios")
        );
        assert_eq!(resolver.android_dir(None), temp_dir.path().join("android"));
        assert_eq!(resolver.host_entitlements(None), None);

        let result = resolver.resolve(None, |c| Some(c.ios.dir.clone()), PathBuf::new());
        assert_eq!(result, PathBuf::from("native/ios"));
    }

    #[test]
    fn test_resolver_without_config_uses_start_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let resolver = ConfigResolver::discover_from(temp_dir.path()).unwrap();
        assert!(resolver.config_path.is_none());
        assert_eq!(resolver.targets_dir(None), temp_dir.path().join("targets"));
        assert_eq!(resolver.app_config(None), temp_dir.path().join("app.json"));
    }

    #[test]
    fn test_generate_starter_toml() {
        let toml_text = ApptargetsConfig::generate_starter_toml("HostApp");
        assert!(toml_text.contains("targets_dir = \"targets\""));
        assert!(toml_text.contains("ios/HostApp/HostApp.entitlements"));

        let parsed: ApptargetsConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.android.dir, PathBuf::from("android"));
    }
}

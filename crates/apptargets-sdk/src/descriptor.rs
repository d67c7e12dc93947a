//! Target descriptors and their resolution against the defaults table.
//!
//! A [`TargetDescriptor`] is what a developer writes in `targets/<dir>/target.toml`
//! (or `target.json`). [`resolve`] merges it with the per-type defaults and the host
//! app configuration into a [`ResolvedTarget`] that every mutator can consume
//! without further lookups.
//!
//! ## Example descriptor
//!
//! ```toml
//! type = "share"
//! name = "Content Share!"
//! appGroup = "group.com.example.app"
//!
//! [ios]
//! bundleIdentifier = ".share"
//! activationRules = [{ type = "image", maxCount = 4 }]
//!
//! [ios.colors]
//! "$accent" = { light = "#0a84ff", dark = "#409cff" }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::ColorValue;
use crate::defaults::{ActivationRule, TargetDefaults, TargetType, lookup_defaults};
use crate::entitlements::Entitlements;
use crate::host::HostAppConfig;
use crate::types::{Platform, TargetsError};

/// File names recognized as target descriptors, in lookup order.
pub const DESCRIPTOR_FILES: &[&str] = &["target.toml", "target.json"];

/// A developer-authored, possibly partial, target descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Target kind tag; kept as text so unknown kinds surface as configuration errors.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosTargetConfig>,
}

/// iOS-specific overrides of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosTargetConfig {
    /// Full bundle identifier, or a `.suffix` appended to the host's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_target: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub colors: BTreeMap<String, ColorValue>,
    #[serde(default, skip_serializing_if = "Entitlements::is_empty")]
    pub entitlements: Entitlements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_rules: Option<Vec<ActivationRule>>,
    /// Bundler entry point for React-Native-backed targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl TargetDescriptor {
    /// Parses a descriptor from TOML or JSON, chosen by the file extension.
    pub fn load(path: &Path) -> Result<Self, TargetsError> {
        let contents = fs::read_to_string(path).map_err(|e| TargetsError::io(path, e))?;
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| e.to_string()),
            _ => toml::from_str(&contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| TargetsError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// How a target is configured: a literal descriptor, or a function of the host
/// app configuration.
pub enum TargetConfig {
    Literal(TargetDescriptor),
    Derived(Box<dyn Fn(&HostAppConfig) -> TargetDescriptor + Send + Sync>),
}

impl TargetConfig {
    /// Wraps a function that computes the descriptor from the host configuration.
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&HostAppConfig) -> TargetDescriptor + Send + Sync + 'static,
    {
        TargetConfig::Derived(Box::new(f))
    }

    /// Produces the descriptor, invoking the function form if needed.
    pub fn evaluate(&self, host: &HostAppConfig) -> TargetDescriptor {
        match self {
            TargetConfig::Literal(descriptor) => descriptor.clone(),
            TargetConfig::Derived(f) => f(host),
        }
    }
}

impl From<TargetDescriptor> for TargetConfig {
    fn from(descriptor: TargetDescriptor) -> Self {
        TargetConfig::Literal(descriptor)
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetConfig::Literal(descriptor) => f.debug_tuple("Literal").field(descriptor).finish(),
            TargetConfig::Derived(_) => f.write_str("Derived(<fn>)"),
        }
    }
}

/// A descriptor with every field populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub target_type: TargetType,
    /// Developer-facing name as declared.
    pub name: String,
    /// Build-safe name and idempotency key in the native project.
    pub product_name: String,
    pub display_name: String,
    pub platforms: BTreeSet<Platform>,
    pub app_group: Option<String>,
    /// Bundle identifier of the host app the target was resolved against.
    pub host_bundle_identifier: Option<String>,
    pub ios: ResolvedIos,
    pub defaults: TargetDefaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIos {
    pub bundle_identifier: String,
    pub deployment_target: String,
    pub colors: BTreeMap<String, ColorValue>,
    pub entitlements: Entitlements,
    /// Empty for kinds other than share and action.
    pub activation_rules: Vec<ActivationRule>,
    pub entry: Option<String>,
}

impl ResolvedTarget {
    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    /// Converts back to a literal descriptor with every field explicit.
    pub fn to_descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            target_type: Some(self.target_type.as_str().to_string()),
            name: Some(self.name.clone()),
            display_name: Some(self.display_name.clone()),
            platforms: Some(self.platforms.iter().copied().collect()),
            app_group: self.app_group.clone(),
            ios: Some(IosTargetConfig {
                bundle_identifier: Some(self.ios.bundle_identifier.clone()),
                deployment_target: Some(self.ios.deployment_target.clone()),
                colors: self.ios.colors.clone(),
                entitlements: self.ios.entitlements.clone(),
                activation_rules: (!self.ios.activation_rules.is_empty())
                    .then(|| self.ios.activation_rules.clone()),
                entry: self.ios.entry.clone(),
            }),
        }
    }
}

/// Strips every character that is not an ASCII letter or digit.
///
/// ```
/// assert_eq!(apptargets_sdk::sanitize("My-Target_1!"), "MyTarget1");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Resolves a target configuration against the defaults table and host config.
pub fn resolve(config: &TargetConfig, host: &HostAppConfig) -> Result<ResolvedTarget, TargetsError> {
    let descriptor = config.evaluate(host);

    let tag = descriptor
        .target_type
        .as_deref()
        .ok_or_else(|| TargetsError::Configuration("descriptor is missing 'type'".into()))?;
    let target_type: TargetType = tag.parse()?;
    let defaults = lookup_defaults(target_type);

    let name = descriptor
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            TargetsError::Configuration(format!("{target_type} descriptor is missing 'name'"))
        })?;
    let product_name = sanitize(&name);
    if product_name.is_empty() {
        return Err(TargetsError::Configuration(format!(
            "target name '{name}' has no alphanumeric characters to build a product name from"
        )));
    }

    let platforms: BTreeSet<Platform> = match &descriptor.platforms {
        Some(list) if list.is_empty() => {
            return Err(TargetsError::Configuration(format!(
                "target '{name}' declares an empty 'platforms' list"
            )));
        }
        Some(list) => list.iter().copied().collect(),
        None => BTreeSet::from([Platform::Ios]),
    };

    let ios = descriptor.ios.clone().unwrap_or_default();
    let host_bundle_identifier = host
        .ios
        .bundle_identifier
        .clone()
        .or_else(|| host.android.package.clone());

    let bundle_identifier = match (ios.bundle_identifier.as_deref(), host_bundle_identifier.as_deref()) {
        (Some(suffix), Some(host_id)) if suffix.starts_with('.') => format!("{host_id}{suffix}"),
        (Some(suffix), None) if suffix.starts_with('.') => {
            return Err(TargetsError::Configuration(format!(
                "target '{name}' uses relative bundle identifier '{suffix}' but the host app has no bundle identifier"
            )));
        }
        (Some(explicit), _) => explicit.to_string(),
        (None, Some(host_id)) => format!("{host_id}.{}", defaults.bundle_identifier_suffix),
        (None, None) => {
            return Err(TargetsError::Configuration(format!(
                "cannot derive a bundle identifier for '{name}': set ios.bundleIdentifier on the target or the host app"
            )));
        }
    };

    let deployment_target = match ios.deployment_target {
        Some(version) => {
            if version_lt(&version, defaults.minimum_deployment_target) {
                tracing::warn!(
                    target_name = %name,
                    declared = %version,
                    minimum = defaults.minimum_deployment_target,
                    "deployment target is below the minimum for {target_type} targets"
                );
            }
            version
        }
        None => defaults.minimum_deployment_target.to_string(),
    };

    let activation_rules = match (ios.activation_rules, defaults.default_activation_rules) {
        (Some(rules), Some(_)) if !rules.is_empty() => rules,
        (_, Some(default_rules)) => default_rules.to_vec(),
        (Some(rules), None) if !rules.is_empty() => {
            return Err(TargetsError::Configuration(format!(
                "activation rules are only supported for share and action targets, not {target_type}"
            )));
        }
        (_, None) => Vec::new(),
    };

    if ios.entry.is_some() && !defaults.react_native_capable {
        return Err(TargetsError::Configuration(format!(
            "'entry' is not supported for {target_type} targets"
        )));
    }

    Ok(ResolvedTarget {
        target_type,
        display_name: descriptor.display_name.unwrap_or_else(|| name.clone()),
        name,
        product_name,
        platforms,
        app_group: descriptor.app_group,
        host_bundle_identifier,
        ios: ResolvedIos {
            bundle_identifier,
            deployment_target,
            colors: ios.colors,
            entitlements: ios.entitlements,
            activation_rules,
            entry: ios.entry,
        },
        defaults,
    })
}

/// Compares dotted version strings numerically (`"9.0" < "14.0"`).
fn version_lt(a: &str, b: &str) -> bool {
    let parse = |v: &str| -> Vec<u32> { v.split('.').map(|p| p.parse().unwrap_or(0)).collect() };
    let (mut a, mut b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    a < b
}

/// A target directory found under the targets root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTarget {
    /// Directory holding the descriptor and the target's sources.
    pub dir: PathBuf,
    /// The descriptor file itself.
    pub descriptor_path: PathBuf,
}

impl DiscoveredTarget {
    /// Directory name, used to label the target before it resolves.
    pub fn label(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }
}

/// Lists target directories under `targets_root`, sorted by directory name.
///
/// A missing root yields an empty list.
pub fn discover_targets(targets_root: &Path) -> Result<Vec<DiscoveredTarget>, TargetsError> {
    if !targets_root.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    let entries = fs::read_dir(targets_root).map_err(|e| TargetsError::io(targets_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TargetsError::io(targets_root, e))?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        if let Some(descriptor_path) = DESCRIPTOR_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|candidate| candidate.is_file())
        {
            found.push(DiscoveredTarget {
                dir,
                descriptor_path,
            });
        }
    }
    found.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::ActivationContent;

    fn host() -> HostAppConfig {
        HostAppConfig::new("Host App").with_bundle_identifier("com.example.app")
    }

    fn descriptor(ty: &str, name: &str) -> TargetDescriptor {
        TargetDescriptor {
            target_type: Some(ty.into()),
            name: Some(name.into()),
            ..TargetDescriptor::default()
        }
    }

    #[test]
    fn sanitize_strips_non_alphanumerics() {
        assert_eq!(sanitize("My-Target_1!"), "MyTarget1");
        assert_eq!(sanitize("Content Share!"), "ContentShare");
        assert_eq!(sanitize("émoji 🎉 widget"), "mojiwidget");
    }

    #[test]
    fn fills_defaults_for_share_target() {
        let mut d = descriptor("share", "Content Share!");
        d.app_group = Some("group.x".into());
        let resolved = resolve(&d.into(), &host()).unwrap();
        assert_eq!(resolved.product_name, "ContentShare");
        assert_eq!(resolved.display_name, "Content Share!");
        assert_eq!(resolved.ios.bundle_identifier, "com.example.app.share");
        assert_eq!(
            resolved.ios.deployment_target,
            lookup_defaults(TargetType::Share).minimum_deployment_target
        );
        assert_eq!(resolved.ios.activation_rules.len(), 2);
        assert_eq!(resolved.platforms, BTreeSet::from([Platform::Ios]));
    }

    #[test]
    fn relative_and_explicit_bundle_identifiers() {
        let mut d = descriptor("widget", "W");
        d.ios = Some(IosTargetConfig {
            bundle_identifier: Some(".widgets.main".into()),
            ..IosTargetConfig::default()
        });
        let resolved = resolve(&d.clone().into(), &host()).unwrap();
        assert_eq!(resolved.ios.bundle_identifier, "com.example.app.widgets.main");

        d.ios.as_mut().unwrap().bundle_identifier = Some("org.other.widget".into());
        let resolved = resolve(&d.into(), &host()).unwrap();
        assert_eq!(resolved.ios.bundle_identifier, "org.other.widget");
    }

    #[test]
    fn function_form_sees_host_config() {
        let config = TargetConfig::derived(|host| TargetDescriptor {
            target_type: Some("widget".into()),
            name: Some(format!("{} Widget", host.name)),
            ..TargetDescriptor::default()
        });
        let resolved = resolve(&config, &host()).unwrap();
        assert_eq!(resolved.product_name, "HostAppWidget");
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut d = descriptor("action", "Edit Photo");
        d.app_group = Some("group.x".into());
        d.ios = Some(IosTargetConfig {
            activation_rules: Some(vec![ActivationRule::new(ActivationContent::Video, Some(2))]),
            entry: Some("index.action.js".into()),
            ..IosTargetConfig::default()
        });
        let host = host();
        let first = resolve(&d.into(), &host).unwrap();
        let second = resolve(&first.to_descriptor().into(), &host).unwrap();
        assert_eq!(first, second);

        for ty in TargetType::ALL {
            let first = resolve(&descriptor(ty.as_str(), "Some Target").into(), &host).unwrap();
            let again = resolve(&first.to_descriptor().into(), &host).unwrap();
            assert_eq!(first, again, "{ty}");
        }
    }

    #[test]
    fn rejects_missing_or_unknown_type() {
        let mut d = descriptor("widget", "W");
        d.target_type = None;
        assert!(matches!(resolve(&d.into(), &host()), Err(TargetsError::Configuration(_))));
        assert!(matches!(
            resolve(&descriptor("carousel", "W").into(), &host()),
            Err(TargetsError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_empty_platforms_and_nameless_targets() {
        let mut d = descriptor("widget", "W");
        d.platforms = Some(vec![]);
        assert!(matches!(resolve(&d.into(), &host()), Err(TargetsError::Configuration(_))));
        assert!(matches!(
            resolve(&descriptor("widget", "!!!").into(), &host()),
            Err(TargetsError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_activation_rules_and_entry_on_unsupported_kinds() {
        let mut d = descriptor("widget", "W");
        d.ios = Some(IosTargetConfig {
            activation_rules: Some(vec![ActivationRule::new(ActivationContent::Text, None)]),
            ..IosTargetConfig::default()
        });
        assert!(matches!(resolve(&d.into(), &host()), Err(TargetsError::Configuration(_))));

        let mut d = descriptor("widget", "W");
        d.ios = Some(IosTargetConfig {
            entry: Some("index.widget.js".into()),
            ..IosTargetConfig::default()
        });
        assert!(matches!(resolve(&d.into(), &host()), Err(TargetsError::Configuration(_))));
    }

    #[test]
    fn host_without_bundle_identifier_needs_explicit_one() {
        let host = HostAppConfig::new("Bare");
        assert!(matches!(
            resolve(&descriptor("widget", "W").into(), &host),
            Err(TargetsError::Configuration(_))
        ));
        let host = HostAppConfig::new("Bare").with_package("com.bare.app");
        let resolved = resolve(&descriptor("widget", "W").into(), &host).unwrap();
        assert_eq!(resolved.ios.bundle_identifier, "com.bare.app.widget");
    }

    #[test]
    fn loads_toml_and_json_descriptors() {
        let dir = tempfile::TempDir::new().unwrap();
        let toml_path = dir.path().join("target.toml");
        fs::write(
            &toml_path,
            r##"
type = "share"
name = "Content Share!"
appGroup = "group.x"
platforms = ["ios", "android"]

[ios]
bundleIdentifier = ".share"
activationRules = [{ type = "image", maxCount = 4 }]

[ios.colors]
"$accent" = { light = "#0a84ff", dark = "#409cff" }

[ios.entitlements]
"com.apple.developer.associated-domains" = ["applinks:example.com"]
"##,
        )
        .unwrap();
        let d = TargetDescriptor::load(&toml_path).unwrap();
        assert_eq!(d.target_type.as_deref(), Some("share"));
        let ios = d.ios.as_ref().unwrap();
        assert_eq!(
            ios.activation_rules.as_ref().unwrap()[0],
            ActivationRule::new(ActivationContent::Image, Some(4))
        );
        assert!(ios.colors.contains_key("$accent"));
        assert_eq!(ios.entitlements.len(), 1);

        let json_path = dir.path().join("target.json");
        fs::write(&json_path, r#"{"type": "widget", "name": "Clock"}"#).unwrap();
        let d = TargetDescriptor::load(&json_path).unwrap();
        assert_eq!(d.name.as_deref(), Some("Clock"));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "type = [").unwrap();
        assert!(matches!(TargetDescriptor::load(&bad), Err(TargetsError::Parse { .. })));
    }

    #[test]
    fn discovers_target_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        for (sub, file) in [("b-widget", "target.toml"), ("a-share", "target.json")] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join(file), "").unwrap();
        }
        fs::create_dir_all(dir.path().join("not-a-target")).unwrap();
        let found = discover_targets(dir.path()).unwrap();
        let labels: Vec<_> = found.iter().map(DiscoveredTarget::label).collect();
        assert_eq!(labels, ["a-share", "b-widget"]);
        assert!(discover_targets(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn compares_versions_numerically() {
        assert!(version_lt("9.0", "14.0"));
        assert!(!version_lt("16.1", "16"));
        assert!(version_lt("16", "16.1"));
    }
}

//! Entitlement and app-group synchronization between the host app and its targets.
//!
//! Synchronization is additive: the host only ever gains entries, and entries the
//! host already owns are never removed or rewritten. Applying it for several targets
//! in any order yields the same host entitlement set.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::TargetType;
use crate::descriptor::ResolvedTarget;
use crate::plist::PlistValue;
use crate::types::TargetsError;

/// Shared-container identifiers.
pub const APP_GROUPS: &str = "com.apple.security.application-groups";
/// Team identifier. A target cannot declare a different team than its host.
pub const TEAM_IDENTIFIER: &str = "com.apple.developer.team-identifier";
/// Set on an App Clip, naming the full app it belongs to.
pub const PARENT_APPLICATION_IDENTIFIERS: &str =
    "com.apple.developer.parent-application-identifiers";
/// Set on the host, naming the App Clips it owns.
pub const ASSOCIATED_APPCLIP_IDENTIFIERS: &str =
    "com.apple.developer.associated-appclip-app-identifiers";

const APP_IDENTIFIER_PREFIX: &str = "$(AppIdentifierPrefix)";

/// Host entitlements a target starts from unless it declares its own value.
const INHERITED_FROM_HOST: &[&str] = &["aps-environment"];

/// Scalar entitlements that must agree between host and target.
const HOST_COUPLED: &[&str] = &[TEAM_IDENTIFIER];

/// A single entitlement value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntitlementValue {
    Bool(bool),
    String(String),
    Array(Vec<String>),
}

impl EntitlementValue {
    fn to_plist(&self) -> PlistValue {
        match self {
            EntitlementValue::Bool(b) => PlistValue::Bool(*b),
            EntitlementValue::String(s) => PlistValue::string(s.clone()),
            EntitlementValue::Array(items) => {
                PlistValue::Array(items.iter().cloned().map(PlistValue::String).collect())
            }
        }
    }
}

impl EntitlementValue {
    /// Reads a stored plist value. Types other than booleans, strings and
    /// string arrays have no entitlement form and yield `None`.
    fn from_stored(value: &::plist::Value) -> Option<Self> {
        match value {
            ::plist::Value::Boolean(b) => Some(EntitlementValue::Bool(*b)),
            ::plist::Value::String(s) => Some(EntitlementValue::String(s.clone())),
            ::plist::Value::Array(items) => items
                .iter()
                .map(|item| item.as_string().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(EntitlementValue::Array),
            _ => None,
        }
    }

    fn to_stored(&self) -> ::plist::Value {
        match self {
            EntitlementValue::Bool(b) => ::plist::Value::Boolean(*b),
            EntitlementValue::String(s) => ::plist::Value::String(s.clone()),
            EntitlementValue::Array(items) => ::plist::Value::Array(
                items.iter().cloned().map(::plist::Value::String).collect(),
            ),
        }
    }
}

impl fmt::Display for EntitlementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitlementValue::Bool(b) => write!(f, "{b}"),
            EntitlementValue::String(s) => write!(f, "\"{s}\""),
            EntitlementValue::Array(items) => write!(f, "{items:?}"),
        }
    }
}

/// Entitlement key to value mapping of one native target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entitlements(BTreeMap<String, EntitlementValue>);

impl Entitlements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&EntitlementValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: EntitlementValue) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntitlementValue)> {
        self.0.iter()
    }

    /// Values of an array-valued entitlement, empty when absent or scalar.
    pub fn array(&self, key: &str) -> &[String] {
        match self.0.get(key) {
            Some(EntitlementValue::Array(items)) => items,
            _ => &[],
        }
    }

    /// Appends `value` to the array entitlement `key`, creating it if needed.
    /// Returns whether the value was added.
    pub fn add_to_array(&mut self, key: &str, value: &str) -> Result<bool, TargetsError> {
        self.add_at(key, value, |items| items.len())
    }

    /// Like [`Entitlements::add_to_array`], but places `value` before the
    /// first existing item that sorts after it, so the result does not depend
    /// on the order values arrive in.
    pub fn add_to_array_sorted(&mut self, key: &str, value: &str) -> Result<bool, TargetsError> {
        self.add_at(key, value, |items| {
            items
                .iter()
                .position(|existing| existing.as_str() > value)
                .unwrap_or(items.len())
        })
    }

    fn add_at(
        &mut self,
        key: &str,
        value: &str,
        index: impl FnOnce(&[String]) -> usize,
    ) -> Result<bool, TargetsError> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| EntitlementValue::Array(Vec::new()));
        match entry {
            EntitlementValue::Array(items) => {
                if items.iter().any(|existing| existing == value) {
                    Ok(false)
                } else {
                    let at = index(items);
                    items.insert(at, value.to_string());
                    Ok(true)
                }
            }
            scalar => Err(TargetsError::EntitlementMismatch {
                key: key.to_string(),
                host: scalar.to_string(),
                target: format!("[\"{value}\"]"),
            }),
        }
    }

    /// Entitlements held in an existing entitlements file. Keys whose values have
    /// no entitlement form are left out here and stay untouched in the file.
    pub fn from_stored(dict: &::plist::Dictionary) -> Self {
        dict.iter()
            .filter_map(|(key, value)| match EntitlementValue::from_stored(value) {
                Some(value) => Some((key.clone(), value)),
                None => {
                    tracing::debug!(key = %key, "keeping non-entitlement value as stored");
                    None
                }
            })
            .collect()
    }

    /// Layers `other` on top: arrays present on both sides are unioned, any
    /// other value from `other` replaces the current one.
    pub fn overlay(&mut self, other: &Entitlements) {
        for (key, value) in other.iter() {
            match (self.0.get_mut(key), value) {
                (Some(EntitlementValue::Array(existing)), EntitlementValue::Array(extra)) => {
                    for item in extra {
                        if !existing.contains(item) {
                            existing.push(item.clone());
                        }
                    }
                }
                _ => self.insert(key.clone(), value.clone()),
            }
        }
    }

    /// Writes every entitlement into `dict`, keeping the keys it holds that
    /// are not set here.
    pub fn store_into(&self, dict: &mut ::plist::Dictionary) {
        for (key, value) in self.iter() {
            dict.insert(key.clone(), value.to_stored());
        }
    }

    /// Renders the entitlements as a plist dictionary.
    pub fn to_plist(&self) -> PlistValue {
        PlistValue::Dict(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.to_plist()))
                .collect(),
        )
    }
}

impl FromIterator<(String, EntitlementValue)> for Entitlements {
    fn from_iter<I: IntoIterator<Item = (String, EntitlementValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ensures the host and the target agree on shared entitlements.
///
/// Returns the target's complete entitlement set and adds the target's app group
/// (and, for App Clips, the clip association) to `host`. The host is only modified
/// when every check passes.
pub fn sync_entitlements(
    host: &mut Entitlements,
    target: &ResolvedTarget,
) -> Result<Entitlements, TargetsError> {
    let mut merged = Entitlements::new();
    for key in INHERITED_FROM_HOST {
        if let Some(value) = host.get(key) {
            merged.insert(*key, value.clone());
        }
    }

    for (key, declared) in target.ios.entitlements.iter() {
        if HOST_COUPLED.contains(&key.as_str()) {
            if let Some(host_value) = host.get(key) {
                if host_value != declared {
                    return Err(TargetsError::EntitlementMismatch {
                        key: key.clone(),
                        host: host_value.to_string(),
                        target: declared.to_string(),
                    });
                }
            }
        }
        let unioned = match (merged.0.get_mut(key), declared) {
            (Some(EntitlementValue::Array(existing)), EntitlementValue::Array(extra)) => {
                for item in extra {
                    if !existing.contains(item) {
                        existing.push(item.clone());
                    }
                }
                true
            }
            _ => false,
        };
        if !unioned {
            merged.insert(key.clone(), declared.clone());
        }
    }

    let mut host_additions: Vec<(&str, String)> = Vec::new();

    if let Some(group) = &target.app_group {
        reject_scalar(host, APP_GROUPS, group, Side::Host)?;
        reject_scalar(&merged, APP_GROUPS, group, Side::Target)?;
        merged.add_to_array(APP_GROUPS, group)?;
        host_additions.push((APP_GROUPS, group.clone()));
    }

    if target.target_type == TargetType::Clip {
        let host_bundle = target.host_bundle_identifier.as_deref().ok_or_else(|| {
            TargetsError::Configuration(format!(
                "App Clip '{}' needs a host bundle identifier",
                target.name
            ))
        })?;
        let parent = format!("{APP_IDENTIFIER_PREFIX}{host_bundle}");
        let clip = format!("{APP_IDENTIFIER_PREFIX}{}", target.ios.bundle_identifier);
        reject_scalar(&merged, PARENT_APPLICATION_IDENTIFIERS, &parent, Side::Target)?;
        reject_scalar(host, ASSOCIATED_APPCLIP_IDENTIFIERS, &clip, Side::Host)?;
        merged.add_to_array(PARENT_APPLICATION_IDENTIFIERS, &parent)?;
        host_additions.push((ASSOCIATED_APPCLIP_IDENTIFIERS, clip));
        validate_app_clip(target, &merged)?;
    }

    for (key, value) in host_additions {
        if host.add_to_array_sorted(key, &value)? {
            tracing::debug!(key, value = %value, "added host entitlement");
        }
    }

    Ok(merged)
}

/// Checks the structural App Clip invariant: the clip's bundle identifier is
/// nested under its host's, and the clip names the host as its parent app.
pub fn validate_app_clip(
    target: &ResolvedTarget,
    clip_entitlements: &Entitlements,
) -> Result<(), TargetsError> {
    let host_bundle = target.host_bundle_identifier.as_deref().unwrap_or_default();
    let required_prefix = format!("{host_bundle}.");
    if host_bundle.is_empty() || !target.ios.bundle_identifier.starts_with(&required_prefix) {
        return Err(TargetsError::Configuration(format!(
            "App Clip bundle identifier '{}' must start with the host bundle identifier '{}'",
            target.ios.bundle_identifier, required_prefix
        )));
    }
    let parent = format!("{APP_IDENTIFIER_PREFIX}{host_bundle}");
    if !clip_entitlements
        .array(PARENT_APPLICATION_IDENTIFIERS)
        .contains(&parent)
    {
        return Err(TargetsError::EntitlementMismatch {
            key: PARENT_APPLICATION_IDENTIFIERS.to_string(),
            host: format!("[\"{parent}\"]"),
            target: clip_entitlements
                .get(PARENT_APPLICATION_IDENTIFIERS)
                .map(ToString::to_string)
                .unwrap_or_else(|| "nothing".to_string()),
        });
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Side {
    Host,
    Target,
}

fn reject_scalar(
    set: &Entitlements,
    key: &str,
    wanted: &str,
    side: Side,
) -> Result<(), TargetsError> {
    match set.get(key) {
        None | Some(EntitlementValue::Array(_)) => Ok(()),
        Some(scalar) => {
            let (host, target) = match side {
                Side::Host => (scalar.to_string(), format!("[\"{wanted}\"]")),
                Side::Target => (format!("[\"{wanted}\"]"), scalar.to_string()),
            };
            Err(TargetsError::EntitlementMismatch {
                key: key.to_string(),
                host,
                target,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{resolve, TargetConfig, TargetDescriptor};
    use crate::host::HostAppConfig;

    fn host() -> HostAppConfig {
        HostAppConfig::new("Host").with_bundle_identifier("com.example.host")
    }

    fn target(ty: &str, name: &str, group: Option<&str>) -> ResolvedTarget {
        let descriptor = TargetDescriptor {
            target_type: Some(ty.into()),
            name: Some(name.into()),
            app_group: group.map(Into::into),
            ..TargetDescriptor::default()
        };
        resolve(&TargetConfig::from(descriptor), &host()).unwrap()
    }

    fn host_entitlements() -> Entitlements {
        [
            (
                "aps-environment".to_string(),
                EntitlementValue::String("production".into()),
            ),
            (
                "com.apple.developer.associated-domains".to_string(),
                EntitlementValue::Array(vec!["applinks:example.com".into()]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn app_group_lands_on_host_and_target() {
        let mut host = host_entitlements();
        let share = target("share", "Share", Some("group.x"));
        let synced = sync_entitlements(&mut host, &share).unwrap();
        assert_eq!(host.array(APP_GROUPS), ["group.x"]);
        assert_eq!(synced.array(APP_GROUPS), ["group.x"]);
        assert_eq!(
            synced.get("aps-environment"),
            Some(&EntitlementValue::String("production".into()))
        );
        assert!(host.get("com.apple.developer.associated-domains").is_some());
    }

    #[test]
    fn sync_is_commutative_and_never_duplicates() {
        let a = target("widget", "Widget", Some("group.shared"));
        let b = target("share", "Share", Some("group.shared"));

        let mut ab = host_entitlements();
        sync_entitlements(&mut ab, &a).unwrap();
        sync_entitlements(&mut ab, &b).unwrap();

        let mut ba = host_entitlements();
        sync_entitlements(&mut ba, &b).unwrap();
        sync_entitlements(&mut ba, &a).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab.array(APP_GROUPS), ["group.shared"]);
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn distinct_groups_land_on_the_host_in_the_same_order_either_way() {
        let a = target("widget", "Widget", Some("group.a"));
        let b = target("share", "Share", Some("group.b"));

        let mut ab = Entitlements::new();
        sync_entitlements(&mut ab, &a).unwrap();
        sync_entitlements(&mut ab, &b).unwrap();
        let mut ba = Entitlements::new();
        sync_entitlements(&mut ba, &b).unwrap();
        sync_entitlements(&mut ba, &a).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab.array(APP_GROUPS), ["group.a", "group.b"]);
        assert_eq!(
            crate::plist::to_xml(&ab.to_plist()),
            crate::plist::to_xml(&ba.to_plist())
        );
    }

    #[test]
    fn host_groups_keep_existing_entries_and_slot_new_ones_in_order() {
        let mut host = Entitlements::new();
        host.insert(
            APP_GROUPS,
            EntitlementValue::Array(vec!["group.m".into(), "group.z".into()]),
        );
        sync_entitlements(&mut host, &target("widget", "Widget", Some("group.q"))).unwrap();
        sync_entitlements(&mut host, &target("share", "Share", Some("group.a"))).unwrap();
        assert_eq!(
            host.array(APP_GROUPS),
            ["group.a", "group.m", "group.q", "group.z"]
        );
    }

    #[test]
    fn stored_entitlements_survive_a_sync() {
        let mut stored = ::plist::Dictionary::new();
        stored.insert(
            "com.apple.developer.associated-domains".into(),
            ::plist::Value::Array(vec!["applinks:example.com".into()]),
        );
        stored.insert(
            "com.apple.developer.icloud-container-environment".into(),
            ::plist::Value::from(1i64),
        );
        let mut host = Entitlements::from_stored(&stored);
        assert_eq!(host.len(), 1);

        host.overlay(&host_entitlements());
        sync_entitlements(&mut host, &target("share", "Share", Some("group.x"))).unwrap();
        host.store_into(&mut stored);

        assert_eq!(
            stored.get("com.apple.developer.associated-domains"),
            Some(&::plist::Value::Array(vec!["applinks:example.com".into()]))
        );
        assert_eq!(
            stored.get("com.apple.developer.icloud-container-environment"),
            Some(&::plist::Value::from(1i64))
        );
        assert_eq!(
            stored.get(APP_GROUPS),
            Some(&::plist::Value::Array(vec!["group.x".into()]))
        );
        assert!(stored.get("aps-environment").is_some());
    }

    #[test]
    fn target_extras_are_unioned_and_scalars_override_inherited_defaults() {
        let mut resolved = target("widget", "Widget", Some("group.x"));
        resolved.ios.entitlements = [
            (
                APP_GROUPS.to_string(),
                EntitlementValue::Array(vec!["group.extra".into()]),
            ),
            (
                "aps-environment".to_string(),
                EntitlementValue::String("development".into()),
            ),
        ]
        .into_iter()
        .collect();

        let mut host = host_entitlements();
        let synced = sync_entitlements(&mut host, &resolved).unwrap();
        assert_eq!(synced.array(APP_GROUPS), ["group.extra", "group.x"]);
        assert_eq!(
            synced.get("aps-environment"),
            Some(&EntitlementValue::String("development".into()))
        );
        // The host never gains target-only extras.
        assert_eq!(host.array(APP_GROUPS), ["group.x"]);
        assert_eq!(
            host.get("aps-environment"),
            Some(&EntitlementValue::String("production".into()))
        );
    }

    #[test]
    fn scalar_app_group_on_host_is_a_mismatch() {
        let mut host: Entitlements = [(
            APP_GROUPS.to_string(),
            EntitlementValue::String("group.legacy".into()),
        )]
        .into_iter()
        .collect();
        let before = host.clone();
        let err = sync_entitlements(&mut host, &target("share", "S", Some("group.x"))).unwrap_err();
        match err {
            TargetsError::EntitlementMismatch { key, host: h, target: t } => {
                assert_eq!(key, APP_GROUPS);
                assert!(h.contains("group.legacy"));
                assert!(t.contains("group.x"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(host, before);
    }

    #[test]
    fn conflicting_team_identifier_is_a_mismatch() {
        let mut host: Entitlements = [(
            TEAM_IDENTIFIER.to_string(),
            EntitlementValue::String("TEAM1".into()),
        )]
        .into_iter()
        .collect();
        let mut resolved = target("widget", "Widget", None);
        resolved.ios.entitlements = [(
            TEAM_IDENTIFIER.to_string(),
            EntitlementValue::String("TEAM2".into()),
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            sync_entitlements(&mut host, &resolved),
            Err(TargetsError::EntitlementMismatch { .. })
        ));
    }

    #[test]
    fn app_clip_is_associated_with_its_parent() {
        let mut host = Entitlements::new();
        let clip = target("clip", "Clip", None);
        let synced = sync_entitlements(&mut host, &clip).unwrap();
        assert_eq!(
            synced.array(PARENT_APPLICATION_IDENTIFIERS),
            ["$(AppIdentifierPrefix)com.example.host"]
        );
        assert_eq!(
            host.array(ASSOCIATED_APPCLIP_IDENTIFIERS),
            ["$(AppIdentifierPrefix)com.example.host.clip"]
        );
    }

    #[test]
    fn app_clip_outside_host_namespace_is_rejected() {
        let mut clip = target("clip", "Clip", None);
        clip.ios.bundle_identifier = "com.other.clip".into();
        let mut host = Entitlements::new();
        assert!(matches!(
            sync_entitlements(&mut host, &clip),
            Err(TargetsError::Configuration(_))
        ));
        assert!(host.is_empty());
    }

    #[test]
    fn renders_as_plist_dictionary() {
        let plist = host_entitlements().to_plist();
        let xml = crate::plist::to_xml(&plist);
        assert!(xml.contains("<key>aps-environment</key>"));
        assert!(xml.contains("<string>applinks:example.com</string>"));
    }
}

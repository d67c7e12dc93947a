//! Info.plist contents for a resolved target.

use crate::defaults::TargetType;
use crate::descriptor::ResolvedTarget;
use crate::plist::PlistValue;

/// Builds the target's Info.plist dictionary.
///
/// Extensions get an `NSExtension` block with their extension point and, for
/// share/action kinds, the activation rule dictionary. App Clips and watch apps
/// get their application-specific keys instead.
pub fn info_plist(target: &ResolvedTarget) -> PlistValue {
    let mut entries: Vec<(String, PlistValue)> = [
        ("CFBundleDevelopmentRegion", "$(DEVELOPMENT_LANGUAGE)"),
        ("CFBundleDisplayName", target.display_name.as_str()),
        ("CFBundleExecutable", "$(EXECUTABLE_NAME)"),
        ("CFBundleIdentifier", "$(PRODUCT_BUNDLE_IDENTIFIER)"),
        ("CFBundleInfoDictionaryVersion", "6.0"),
        ("CFBundleName", "$(PRODUCT_NAME)"),
        ("CFBundlePackageType", "$(PRODUCT_BUNDLE_PACKAGE_TYPE)"),
        ("CFBundleShortVersionString", "$(MARKETING_VERSION)"),
        ("CFBundleVersion", "$(CURRENT_PROJECT_VERSION)"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), PlistValue::string(value)))
    .collect();

    match target.target_type {
        TargetType::Clip => entries.push((
            "NSAppClip".to_string(),
            PlistValue::dict([
                ("NSAppClipRequestEphemeralUserNotification", PlistValue::Bool(false)),
                ("NSAppClipRequestLocationConfirmation", PlistValue::Bool(false)),
            ]),
        )),
        TargetType::Watch => {
            entries.push(("WKApplication".to_string(), PlistValue::Bool(true)));
            if let Some(host) = &target.host_bundle_identifier {
                entries.push((
                    "WKCompanionAppBundleIdentifier".to_string(),
                    PlistValue::string(host),
                ));
            }
        }
        _ => {}
    }

    if let Some(point) = target.defaults.extension_point_identifier {
        entries.push(("NSExtension".to_string(), extension_block(target, point)));
    }
    PlistValue::Dict(entries)
}

fn extension_block(target: &ResolvedTarget, point: &str) -> PlistValue {
    let mut block = vec![(
        "NSExtensionPointIdentifier".to_string(),
        PlistValue::string(point),
    )];
    if !target.ios.activation_rules.is_empty() {
        let rules = target
            .ios
            .activation_rules
            .iter()
            .map(|rule| {
                let value = if rule.content.is_boolean() {
                    PlistValue::Bool(true)
                } else {
                    PlistValue::Integer(i64::from(rule.max_count.unwrap_or(1)))
                };
                (rule.content.rule_key().to_string(), value)
            })
            .collect();
        block.push((
            "NSExtensionAttributes".to_string(),
            PlistValue::dict([("NSExtensionActivationRule", PlistValue::Dict(rules))]),
        ));
    }
    PlistValue::Dict(block)
}

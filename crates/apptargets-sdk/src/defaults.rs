//! Per-type defaults for every supported extension kind.
//!
//! [`lookup_defaults`] is the single source of per-type OS version and bundle
//! identifier policy. It is an exhaustive match over [`TargetType`], so adding a
//! new kind without authoring its defaults does not compile.
//!
//! | Kind | Minimum iOS | Suffix | Product type |
//! |------|-------------|--------|--------------|
//! | `widget` | 14.0 | `widget` | app-extension |
//! | `clip` | 14.0 | `clip` | on-demand-install-capable application |
//! | `stickers` | 10.0 | `stickers` | messages sticker pack |
//! | `app-intent` | 16.0 | `appintent` | ExtensionKit extension |
//! | `watch` | 7.0 (watchOS) | `watchkitapp` | application |
//! | others | 8.0 - 16.1 | see table | app-extension |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::TargetsError;

/// The closed set of native target kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Widget,
    Clip,
    Stickers,
    Share,
    Action,
    Safari,
    NotificationContent,
    NotificationService,
    Intent,
    IntentUi,
    Spotlight,
    BgDownload,
    QuicklookThumbnail,
    LocationPush,
    CredentialsProvider,
    AccountAuth,
    AppIntent,
    DeviceActivityMonitor,
    Matter,
    Watch,
}

impl TargetType {
    /// Every target kind, in declaration order.
    pub const ALL: [TargetType; 20] = [
        TargetType::Widget,
        TargetType::Clip,
        TargetType::Stickers,
        TargetType::Share,
        TargetType::Action,
        TargetType::Safari,
        TargetType::NotificationContent,
        TargetType::NotificationService,
        TargetType::Intent,
        TargetType::IntentUi,
        TargetType::Spotlight,
        TargetType::BgDownload,
        TargetType::QuicklookThumbnail,
        TargetType::LocationPush,
        TargetType::CredentialsProvider,
        TargetType::AccountAuth,
        TargetType::AppIntent,
        TargetType::DeviceActivityMonitor,
        TargetType::Matter,
        TargetType::Watch,
    ];

    /// The tag used in descriptors (`"notification-content"`, `"widget"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Widget => "widget",
            TargetType::Clip => "clip",
            TargetType::Stickers => "stickers",
            TargetType::Share => "share",
            TargetType::Action => "action",
            TargetType::Safari => "safari",
            TargetType::NotificationContent => "notification-content",
            TargetType::NotificationService => "notification-service",
            TargetType::Intent => "intent",
            TargetType::IntentUi => "intent-ui",
            TargetType::Spotlight => "spotlight",
            TargetType::BgDownload => "bg-download",
            TargetType::QuicklookThumbnail => "quicklook-thumbnail",
            TargetType::LocationPush => "location-push",
            TargetType::CredentialsProvider => "credentials-provider",
            TargetType::AccountAuth => "account-auth",
            TargetType::AppIntent => "app-intent",
            TargetType::DeviceActivityMonitor => "device-activity-monitor",
            TargetType::Matter => "matter",
            TargetType::Watch => "watch",
        }
    }

    /// Whether this kind ships as an app extension embedded in the host.
    pub fn is_app_extension(&self) -> bool {
        !matches!(self, TargetType::Clip | TargetType::Watch)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = TargetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                TargetsError::Configuration(format!(
                    "unrecognized target type '{}'. Supported types: {}",
                    s,
                    TargetType::ALL
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Content a share or action extension can be activated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationContent {
    Text,
    Url,
    Image,
    Video,
    File,
    WebPage,
    Attachment,
}

impl ActivationContent {
    /// `NSExtensionActivationRule` dictionary key for this content type.
    pub fn rule_key(&self) -> &'static str {
        match self {
            ActivationContent::Text => "NSExtensionActivationSupportsText",
            ActivationContent::Url => "NSExtensionActivationSupportsWebURLWithMaxCount",
            ActivationContent::Image => "NSExtensionActivationSupportsImageWithMaxCount",
            ActivationContent::Video => "NSExtensionActivationSupportsMovieWithMaxCount",
            ActivationContent::File => "NSExtensionActivationSupportsFileWithMaxCount",
            ActivationContent::WebPage => "NSExtensionActivationSupportsWebPageWithMaxCount",
            ActivationContent::Attachment => "NSExtensionActivationSupportsAttachmentsWithMaxCount",
        }
    }

    /// Text is a boolean rule; every other content type carries a max count.
    pub fn is_boolean(&self) -> bool {
        matches!(self, ActivationContent::Text)
    }
}

/// A single activation predicate: content type plus optional maximum item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRule {
    #[serde(rename = "type")]
    pub content: ActivationContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
}

impl ActivationRule {
    pub const fn new(content: ActivationContent, max_count: Option<u32>) -> Self {
        Self { content, max_count }
    }
}

/// Build setting that carries the deployment target for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentSetting {
    Ios,
    WatchOs,
}

impl DeploymentSetting {
    pub fn build_setting(&self) -> &'static str {
        match self {
            DeploymentSetting::Ios => "IPHONEOS_DEPLOYMENT_TARGET",
            DeploymentSetting::WatchOs => "WATCHOS_DEPLOYMENT_TARGET",
        }
    }
}

/// Fully-populated defaults record for one target kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefaults {
    /// Lowest OS version the kind can be deployed to.
    pub minimum_deployment_target: &'static str,
    /// Appended to the host bundle identifier when none is declared.
    pub bundle_identifier_suffix: &'static str,
    /// Activation rules used when a share/action target declares none.
    pub default_activation_rules: Option<&'static [ActivationRule]>,
    /// Xcode `productType` of the native target.
    pub product_type: &'static str,
    /// `NSExtensionPointIdentifier`, absent for applications (clips, watch apps).
    pub extension_point_identifier: Option<&'static str>,
    /// System frameworks the target links.
    pub frameworks: &'static [&'static str],
    pub deployment_setting: DeploymentSetting,
    /// Whether the target may run a bundler entry point.
    pub react_native_capable: bool,
}

const APP_EXTENSION: &str = "com.apple.product-type.app-extension";

const SHARE_RULES: &[ActivationRule] = &[
    ActivationRule::new(ActivationContent::Text, None),
    ActivationRule::new(ActivationContent::Url, Some(1)),
];

const ACTION_RULES: &[ActivationRule] = &[ActivationRule::new(ActivationContent::Image, Some(1))];

const fn extension(
    minimum_deployment_target: &'static str,
    bundle_identifier_suffix: &'static str,
    extension_point_identifier: &'static str,
    frameworks: &'static [&'static str],
) -> TargetDefaults {
    TargetDefaults {
        minimum_deployment_target,
        bundle_identifier_suffix,
        default_activation_rules: None,
        product_type: APP_EXTENSION,
        extension_point_identifier: Some(extension_point_identifier),
        frameworks,
        deployment_setting: DeploymentSetting::Ios,
        react_native_capable: false,
    }
}

/// Returns the defaults record for a target kind.
///
/// # Example
///
/// ```
/// use apptargets_sdk::defaults::{lookup_defaults, TargetType};
///
/// let widget = lookup_defaults(TargetType::Widget);
/// assert_eq!(widget.bundle_identifier_suffix, "widget");
/// assert_eq!(widget.minimum_deployment_target, "14.0");
/// ```
pub fn lookup_defaults(target_type: TargetType) -> TargetDefaults {
    match target_type {
        TargetType::Widget => extension(
            "14.0",
            "widget",
            "com.apple.widgetkit-extension",
            &["WidgetKit", "SwiftUI"],
        ),
        TargetType::Clip => TargetDefaults {
            minimum_deployment_target: "14.0",
            bundle_identifier_suffix: "clip",
            default_activation_rules: None,
            product_type: "com.apple.product-type.application.on-demand-install-capable",
            extension_point_identifier: None,
            frameworks: &["AppClip"],
            deployment_setting: DeploymentSetting::Ios,
            react_native_capable: true,
        },
        TargetType::Stickers => TargetDefaults {
            product_type: "com.apple.product-type.app-extension.messages-sticker-pack",
            ..extension(
                "10.0",
                "stickers",
                "com.apple.message-payload-provider",
                &[],
            )
        },
        TargetType::Share => TargetDefaults {
            default_activation_rules: Some(SHARE_RULES),
            react_native_capable: true,
            ..extension("12.0", "share", "com.apple.share-services", &[])
        },
        TargetType::Action => TargetDefaults {
            default_activation_rules: Some(ACTION_RULES),
            react_native_capable: true,
            ..extension("12.0", "action", "com.apple.ui-services", &[])
        },
        TargetType::Safari => extension(
            "15.0",
            "safari",
            "com.apple.Safari.web-extension",
            &["SafariServices"],
        ),
        TargetType::NotificationContent => extension(
            "10.0",
            "notification-content",
            "com.apple.usernotifications.content-extension",
            &["UserNotifications", "UserNotificationsUI"],
        ),
        TargetType::NotificationService => extension(
            "10.0",
            "notification-service",
            "com.apple.usernotifications.service",
            &["UserNotifications"],
        ),
        TargetType::Intent => extension("10.0", "intent", "com.apple.intents-service", &["Intents"]),
        TargetType::IntentUi => extension(
            "10.0",
            "intent-ui",
            "com.apple.intents-ui-service",
            &["IntentsUI"],
        ),
        TargetType::Spotlight => extension(
            "9.0",
            "spotlight",
            "com.apple.spotlight.index",
            &["CoreSpotlight"],
        ),
        TargetType::BgDownload => extension(
            "16.0",
            "bg-download",
            "com.apple.background-asset-downloader-extension",
            &["BackgroundAssets"],
        ),
        TargetType::QuicklookThumbnail => extension(
            "11.0",
            "quicklook-thumbnail",
            "com.apple.quicklook.thumbnail",
            &["QuickLookThumbnailing"],
        ),
        TargetType::LocationPush => extension(
            "15.0",
            "location-push",
            "com.apple.location.push.service",
            &["CoreLocation"],
        ),
        TargetType::CredentialsProvider => extension(
            "12.0",
            "credentials-provider",
            "com.apple.authentication-services-credential-provider-ui",
            &["AuthenticationServices"],
        ),
        TargetType::AccountAuth => extension(
            "13.0",
            "account-auth",
            "com.apple.AppSSO.idp-extension",
            &["AuthenticationServices"],
        ),
        TargetType::AppIntent => TargetDefaults {
            product_type: "com.apple.product-type.extensionkit-extension",
            ..extension(
                "16.0",
                "appintent",
                "com.apple.appintents-extension",
                &["AppIntents"],
            )
        },
        TargetType::DeviceActivityMonitor => extension(
            "15.0",
            "device-activity-monitor",
            "com.apple.deviceactivity.monitor-extension",
            &["DeviceActivity"],
        ),
        TargetType::Matter => extension(
            "16.1",
            "matter",
            "com.apple.matter.support.extension.device-setup",
            &["MatterSupport"],
        ),
        TargetType::Watch => TargetDefaults {
            minimum_deployment_target: "7.0",
            bundle_identifier_suffix: "watchkitapp",
            default_activation_rules: None,
            product_type: "com.apple.product-type.application",
            extension_point_identifier: None,
            frameworks: &["SwiftUI"],
            deployment_setting: DeploymentSetting::WatchOs,
            react_native_capable: false,
        },
    }
}

/// Looks up defaults by descriptor tag, failing on unrecognized tags.
pub fn lookup_defaults_by_tag(tag: &str) -> Result<TargetDefaults, TargetsError> {
    Ok(lookup_defaults(tag.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_complete_defaults() {
        for ty in TargetType::ALL {
            let defaults = lookup_defaults(ty);
            assert!(!defaults.minimum_deployment_target.is_empty(), "{ty}");
            assert!(!defaults.bundle_identifier_suffix.is_empty(), "{ty}");
            assert!(defaults.product_type.starts_with("com.apple.product-type."), "{ty}");
            assert_eq!(
                defaults.extension_point_identifier.is_some(),
                ty.is_app_extension(),
                "{ty}"
            );
        }
    }

    #[test]
    fn tags_round_trip_through_from_str() {
        for ty in TargetType::ALL {
            assert_eq!(ty.as_str().parse::<TargetType>().unwrap(), ty);
        }
    }

    #[test]
    fn serde_tag_matches_as_str() {
        for ty in TargetType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn unknown_tag_is_a_configuration_error() {
        let err = lookup_defaults_by_tag("toaster").unwrap_err();
        assert!(matches!(err, TargetsError::Configuration(_)));
        assert!(err.to_string().contains("toaster"));
    }

    #[test]
    fn only_share_and_action_have_activation_rules() {
        for ty in TargetType::ALL {
            let has_rules = lookup_defaults(ty).default_activation_rules.is_some();
            assert_eq!(has_rules, matches!(ty, TargetType::Share | TargetType::Action));
        }
    }

    #[test]
    fn clip_and_widget_need_newer_os_than_legacy_extensions() {
        let clip: f32 = lookup_defaults(TargetType::Clip)
            .minimum_deployment_target
            .parse()
            .unwrap();
        let intent: f32 = lookup_defaults(TargetType::Intent)
            .minimum_deployment_target
            .parse()
            .unwrap();
        assert!(clip > intent);
    }
}

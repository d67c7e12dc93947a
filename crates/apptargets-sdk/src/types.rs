//! Core types for apptargets-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`TargetsError`] - Error types for descriptor resolution and project mutation
//! - [`Platform`] - Native platform selection (iOS or Android)
//! - [`TargetFailure`] - A per-target failure collected during a generation pass

use std::fmt;
use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Error types for apptargets-sdk generation-time operations.
///
/// Every variant is fatal for the target being processed, but a generation pass
/// keeps going with the remaining targets and aggregates failures into
/// [`crate::GenerationReport`].
///
/// # Example
///
/// ```ignore
/// use apptargets_sdk::{resolve, TargetsError};
///
/// match resolve(config, &host) {
///     Ok(target) => println!("resolved {}", target.product_name),
///     Err(TargetsError::Configuration(msg)) => eprintln!("bad descriptor: {msg}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TargetsError {
    /// A descriptor is missing a required field, declares an unrecognized type,
    /// or declares an empty platform set.
    #[error("configuration error: {0}. Check the target's target.toml / target.json")]
    Configuration(String),

    /// The native target node could not be located in the Xcode project graph.
    ///
    /// Target creation belongs to the upstream project generator; this usually
    /// means the project was generated out of band, or two target names collide
    /// after sanitization.
    #[error(
        "project graph error: no native target named '{product_name}' in the Xcode project.\n\n\
         Regenerate the iOS project, or check that no other target sanitizes to the same name"
    )]
    ProjectGraph {
        /// Sanitized product name that was looked up.
        product_name: String,
    },

    /// A structural problem in the project graph other than a missing target.
    #[error("malformed project graph: {0}")]
    MalformedGraph(String),

    /// An I/O error against a specific path.
    #[error("I/O error at {}: {source}. Check file paths and permissions", path.display())]
    Io {
        /// Path that was being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Host and target entitlements cannot be reconciled.
    #[error(
        "entitlement mismatch for '{key}': host has {host}, target declares {target}"
    )]
    EntitlementMismatch {
        /// Entitlement key in conflict.
        key: String,
        /// Host value, rendered for diagnostics.
        host: String,
        /// Target value, rendered for diagnostics.
        target: String,
    },

    /// A project or descriptor file could not be parsed.
    #[error("parse error in {}: {message}", path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TargetsError {
    /// Wraps an I/O error together with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TargetsError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind name used in generation reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TargetsError::Configuration(_) => "configuration",
            TargetsError::ProjectGraph { .. } => "project-graph",
            TargetsError::MalformedGraph(_) => "project-graph",
            TargetsError::Io { .. } => "io",
            TargetsError::EntitlementMismatch { .. } => "entitlement-mismatch",
            TargetsError::Parse { .. } => "parse",
            TargetsError::Serialization(_) => "serialization",
        }
    }
}

/// Native platform a target is synthesized for.
///
/// # Example
///
/// ```
/// use apptargets_sdk::Platform;
///
/// assert_eq!(Platform::Ios.as_str(), "ios");
/// assert_eq!(Platform::Android.as_str(), "android");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Apple platforms (iOS, plus watchOS for watch targets).
    Ios,
    /// Android.
    Android,
}

impl Platform {
    /// Returns the string representation of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = TargetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(TargetsError::Configuration(format!(
                "unknown platform '{other}', expected 'ios' or 'android'"
            ))),
        }
    }
}

/// A target that failed during a generation pass.
#[derive(Debug)]
pub struct TargetFailure {
    /// Directory or declared name identifying the target.
    pub target: String,
    /// Platform step that failed, if the failure happened after resolution.
    pub platform: Option<Platform>,
    /// The error that aborted this target.
    pub error: TargetsError,
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.platform {
            Some(platform) => write!(f, "{} ({}): {}", self.target, platform, self.error),
            None => write!(f, "{}: {}", self.target, self.error),
        }
    }
}

impl Serialize for TargetFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TargetFailure", 4)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("platform", &self.platform)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

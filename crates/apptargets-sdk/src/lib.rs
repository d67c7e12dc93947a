//! Native extension targets for cross-platform mobile apps
//!
//! `apptargets-sdk` turns declarative target descriptors (widgets, share
//! extensions, App Clips, sticker packs and sixteen other kinds) into native
//! build artifacts: Xcode native targets with the right build settings,
//! entitlements, Info.plist and asset catalogs, plus the Android app module's
//! namespace. It also ships the runtime storage bridge that lets a host app and
//! its extensions exchange small key/value data through a shared container.
//!
//! # Quick Start
//!
//! 1. Describe a target in `targets/<name>/target.toml`:
//! ```toml
//! type = "share"
//! name = "Content Share!"
//! appGroup = "group.com.example.app"
//! ```
//!
//! 2. Run a generation pass after the native projects exist:
//! ```bash
//! apptargets prebuild
//! ```
//!
//! # Architecture
//!
//! - **Defaults**: per-kind defaults table covering every [`TargetType`]
//! - **Descriptor**: resolves partial descriptors against the host app and defaults
//! - **iOS**: pbxproj codec, project graph and the idempotent target mutator
//! - **Android**: Gradle namespace fix
//! - **Entitlements**: host/target app-group and App Clip association sync
//! - **Storage**: runtime key/value bridge with explicit platform selection
//! - **Bundler**: per-target entry point routing for the JS bundler
//! - **Plugin**: the generation pass tying the above together
//!
//! # Example: Programmatic Usage
//!
//! ```ignore
//! use apptargets_sdk::{GenerationContext, HostAppConfig, TargetEntry, discover_targets, generate};
//!
//! fn main() -> Result<(), apptargets_sdk::TargetsError> {
//!     let host = HostAppConfig::load("app.json".as_ref())?;
//!     let ctx = GenerationContext::new(".");
//!     let targets = discover_targets("targets".as_ref())?
//!         .into_iter()
//!         .map(TargetEntry::from)
//!         .collect();
//!     let (_host, report) = generate(host, &ctx, targets)?;
//!     for failure in &report.failures {
//!         eprintln!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```

// Public modules
pub mod android;
pub mod assets;
pub mod bundler;
pub mod defaults;
pub mod descriptor;
pub mod entitlements;
pub mod host;
pub mod ios;
pub mod plist;
pub mod plugin;
pub mod scaffold;
pub mod storage;
pub mod types;

// Re-export key types for convenience
pub use android::{fix_namespace, fix_namespace_in_project};
pub use bundler::{BundlerConfig, BundlerTargetRouter, TransformOptions};
pub use defaults::{TargetDefaults, TargetType, lookup_defaults, lookup_defaults_by_tag};
pub use descriptor::{
    ResolvedTarget, TargetConfig, TargetDescriptor, discover_targets, resolve, sanitize,
};
pub use entitlements::{Entitlements, sync_entitlements, validate_app_clip};
pub use host::HostAppConfig;
pub use ios::{MutationOutcome, ProjectGraph, ensure_target};
pub use plugin::{GenerationContext, GenerationReport, TargetEntry, generate};
pub use scaffold::scaffold_target;
pub use storage::{StorageBridge, StorageError};
pub use types::{Platform, TargetFailure, TargetsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn defaults_cover_every_type() {
        for ty in TargetType::ALL {
            let defaults = lookup_defaults(ty);
            assert!(!defaults.minimum_deployment_target.is_empty(), "{ty}");
            assert!(!defaults.bundle_identifier_suffix.is_empty(), "{ty}");
        }
    }
}
